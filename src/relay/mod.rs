//! # Relay Engine
//!
//! [`RelayEngine`] owns everything that changes while the relay runs: the outbound
//! command queue, the inbound telemetry queue, and the two throttles that pace them.
//! Transports are borrowed per call, so the engine itself does no I/O setup and can be
//! driven tick by tick from tests.
//!
//! ```text
//!  operator line ─► parse ─► outbound queue ──(network throttle)──► mesh send
//!  mesh packet ──► classify ─┬─► inbound queue ──(serial throttle)──► operator line
//!                            └─► fault line ('E' packets)
//! ```
//!
//! Each call to [`RelayEngine::poll`] handles at most one inbound packet and one
//! operator line, then runs whichever drains are due. A drain moves at most one item
//! and restarts its throttle even when its queue was empty.

use log::{debug, info, warn};

use crate::command::{parse_command, parse_command_with, CommandToSend, Scope};
use crate::fault::{report_fault, Fault, ERROR_TAG};
use crate::logutil::escape_bytes;
use crate::mesh::{
    wire, AddressTable, MeshAddress, NetworkHeader, NetworkTransport, Route, MULTICAST_LEVEL,
};
use crate::serial::SerialLink;

pub mod queue;
pub mod runtime;
pub mod stats;
pub mod throttle;

pub use queue::BoundedQueue;
pub use runtime::Bridge;
pub use stats::RelayStats;
pub use throttle::{MonotonicClock, Throttle, Tick};

pub const DEFAULT_NETWORK_THROTTLE_MS: u32 = 1000;
pub const DEFAULT_SERIAL_THROTTLE_MS: u32 = 50;
pub const DEFAULT_NETWORK_QUEUE: usize = 16;
pub const DEFAULT_DATA_QUEUE: usize = 32;

/// Banner written ahead of an echoed command.
pub const ECHO_BANNER: &str = "---------------Sending command---------------";

/// Static tuning for a [`RelayEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub network_throttle_ms: u32,
    pub serial_throttle_ms: u32,
    pub network_queue_capacity: usize,
    pub data_queue_capacity: usize,
    /// Echo parsed fields on receipt and a description of every command before it is
    /// sent, both on the operator link.
    pub echo_commands: bool,
    /// Period of the debug stats log; 0 disables it.
    pub stats_interval_ms: u32,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            network_throttle_ms: DEFAULT_NETWORK_THROTTLE_MS,
            serial_throttle_ms: DEFAULT_SERIAL_THROTTLE_MS,
            network_queue_capacity: DEFAULT_NETWORK_QUEUE,
            data_queue_capacity: DEFAULT_DATA_QUEUE,
            echo_commands: true,
            stats_interval_ms: 0,
        }
    }
}

/// Telemetry received from a pump, waiting to be relayed to the operator.
#[derive(Debug, PartialEq, Eq)]
pub struct ReceivedData {
    pub timestamp: Tick,
    pub source: MeshAddress,
    pub tag: u8,
    pub payload: i32,
}

impl ReceivedData {
    /// Operator line: `source<TAB>timestamp<TAB>tag<TAB>payload`.
    pub fn to_record(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.source, self.timestamp, self.tag as char, self.payload
        )
    }
}

/// What one outbound drain did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Queue was empty.
    Idle,
    Sent { destination: u16, tag: u8 },
    Failed { destination: u16, tag: u8 },
    /// Destination id outside the address table; the command was dropped.
    Unroutable { destination: u16 },
}

pub struct RelayEngine {
    addresses: AddressTable,
    settings: RelaySettings,
    outbound: BoundedQueue<CommandToSend>,
    inbound: BoundedQueue<ReceivedData>,
    network_throttle: Throttle,
    serial_throttle: Throttle,
    stats_throttle: Throttle,
    stats: RelayStats,
}

impl RelayEngine {
    /// Create an engine whose throttles start counting at `start`.
    pub fn new(addresses: AddressTable, settings: RelaySettings, start: Tick) -> Self {
        Self {
            outbound: BoundedQueue::new(settings.network_queue_capacity),
            inbound: BoundedQueue::new(settings.data_queue_capacity),
            network_throttle: Throttle::new(settings.network_throttle_ms, start),
            serial_throttle: Throttle::new(settings.serial_throttle_ms, start),
            stats_throttle: Throttle::new(settings.stats_interval_ms, start),
            addresses,
            settings,
            stats: RelayStats::default(),
        }
    }

    /// One pass of the control loop.
    pub fn poll<N, S>(&mut self, now: Tick, network: &mut N, serial: &mut S)
    where
        N: NetworkTransport + ?Sized,
        S: SerialLink + ?Sized,
    {
        if let Some((header, payload)) = network.receive() {
            let _ = self.handle_packet(now, header, &payload, serial);
        }
        if let Some(line) = serial.read_line() {
            let _ = self.handle_line(&line, serial);
        }
        if self.network_throttle.is_due(now) {
            self.drain_network(now, network, serial);
        }
        if self.serial_throttle.is_due(now) {
            self.drain_serial(now, serial);
        }
        if self.settings.stats_interval_ms > 0 && self.stats_throttle.is_due(now) {
            self.stats.log(self.outbound.len(), self.inbound.len());
            self.stats_throttle.mark(now);
        }
    }

    /// Parse an operator line and queue the resulting command. Faults are reported on
    /// the serial link and also returned.
    pub fn handle_line<S: SerialLink + ?Sized>(
        &mut self,
        line: &[u8],
        serial: &mut S,
    ) -> Result<(), Fault> {
        debug!("operator line '{}'", escape_bytes(line));
        let parsed = if self.settings.echo_commands {
            parse_command_with(line, |field| write_or_warn(serial, field))
        } else {
            parse_command(line)
        };
        match parsed {
            Ok(cmd) => self.enqueue_command(cmd, serial),
            Err(fault) => {
                self.stats.header_errors += 1;
                report_fault(serial, fault);
                Err(fault)
            }
        }
    }

    /// Queue a parsed command for transmission, rejecting it when the queue is full.
    pub fn enqueue_command<S: SerialLink + ?Sized>(
        &mut self,
        cmd: CommandToSend,
        serial: &mut S,
    ) -> Result<(), Fault> {
        match self.outbound.push(cmd) {
            Ok(()) => {
                self.stats.commands_queued += 1;
                debug!(
                    "command queued (outbound={}/{})",
                    self.outbound.len(),
                    self.outbound.capacity()
                );
                Ok(())
            }
            Err(rejected) => {
                self.stats.commands_dropped += 1;
                debug!(
                    "dropping '{}' command for node {}",
                    rejected.header.command_type as char, rejected.header.destination
                );
                report_fault(serial, Fault::NetworkQueueFull);
                Err(Fault::NetworkQueueFull)
            }
        }
    }

    /// Classify a packet from the mesh: fault reports go straight to the operator,
    /// everything else is queued for relay.
    pub fn handle_packet<S: SerialLink + ?Sized>(
        &mut self,
        now: Tick,
        header: NetworkHeader,
        payload: &[u8],
        serial: &mut S,
    ) -> Result<(), Fault> {
        let value = wire::decode_value(payload);
        match self.addresses.logical_id(header.from) {
            Some(id) => debug!("packet '{}' from node {} ({})", header.tag as char, id, header.from),
            None => debug!("packet '{}' from unlisted address {}", header.tag as char, header.from),
        }
        if header.tag == ERROR_TAG {
            self.stats.remote_faults += 1;
            match Fault::from_code(value) {
                Some(fault) => {
                    debug!("node {} reported {:?}", header.from, fault);
                    report_fault(serial, fault);
                }
                None => warn!("node {} reported unknown fault code {}", header.from, value),
            }
            return Ok(());
        }

        let record = ReceivedData {
            timestamp: now,
            source: header.from,
            tag: header.tag,
            payload: value,
        };
        match self.inbound.push(record) {
            Ok(()) => {
                self.stats.records_queued += 1;
                Ok(())
            }
            Err(dropped) => {
                self.stats.records_dropped += 1;
                debug!("dropping record from {}", dropped.source);
                report_fault(serial, Fault::DataQueueFull);
                Err(Fault::DataQueueFull)
            }
        }
    }

    /// Send the oldest queued command, if any, and restart the network throttle.
    /// Sends are attempted once; the outcome is reported and the command is gone
    /// either way.
    pub fn drain_network<N, S>(&mut self, now: Tick, network: &mut N, serial: &mut S) -> Dispatch
    where
        N: NetworkTransport + ?Sized,
        S: SerialLink + ?Sized,
    {
        self.network_throttle.mark(now);
        let Some(cmd) = self.outbound.pop() else {
            return Dispatch::Idle;
        };
        let destination = cmd.header.destination;
        let tag = cmd.header.command_type;

        let address = match self.addresses.resolve(destination) {
            Ok(addr) => addr,
            Err(fault) => {
                self.stats.commands_dropped += 1;
                warn!("no mesh address for node {}", destination);
                report_fault(serial, fault);
                return Dispatch::Unroutable { destination };
            }
        };
        if self.settings.echo_commands {
            write_or_warn(serial, ECHO_BANNER);
            for line in cmd.describe() {
                write_or_warn(serial, &line);
            }
        }
        let route = match cmd.scope {
            Scope::Single => Route::Unicast(address),
            Scope::Multicast => Route::Multicast {
                base: address,
                level: MULTICAST_LEVEL,
            },
        };
        let payload = wire::encode_command(&cmd.command);

        if network.send(route, tag, &payload) {
            self.stats.commands_sent += 1;
            info!("sent '{}' to node {} via {:?}", tag as char, destination, route);
            write_or_warn(
                serial,
                &format!("Success! Sent {} header to {}", tag as char, destination),
            );
            Dispatch::Sent { destination, tag }
        } else {
            self.stats.send_failures += 1;
            warn!("send of '{}' to node {} failed", tag as char, destination);
            write_or_warn(
                serial,
                &format!("Error sending {} header to {}", tag as char, destination),
            );
            Dispatch::Failed { destination, tag }
        }
    }

    /// Relay the oldest queued record, if any, and restart the serial throttle.
    pub fn drain_serial<S: SerialLink + ?Sized>(
        &mut self,
        now: Tick,
        serial: &mut S,
    ) -> Option<ReceivedData> {
        self.serial_throttle.mark(now);
        let record = self.inbound.pop()?;
        write_or_warn(serial, &record.to_record());
        self.stats.records_relayed += 1;
        Some(record)
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Oldest command still waiting to be sent.
    pub fn next_command(&self) -> Option<&CommandToSend> {
        self.outbound.peek()
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn addresses(&self) -> &AddressTable {
        &self.addresses
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }
}

fn write_or_warn<S: SerialLink + ?Sized>(serial: &mut S, line: &str) {
    if let Err(e) = serial.write_line(line) {
        warn!("serial write failed: {}", e);
    }
}
