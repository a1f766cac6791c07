//! Radio modem link over a serial port.
//!
//! The modem owns the transceiver and the mesh layer; this side only exchanges
//! [`RadioFrame`]s with it. A send counts as accepted once the whole frame has been
//! written to the port.

use anyhow::{anyhow, Result};
use log::{info, trace, warn};
use serialport::SerialPort;
use std::collections::VecDeque;
use std::io::{self, Read, Write};

use super::slip::SlipDecoder;
use super::wire::{self, RadioFrame};
use super::{MeshAddress, NetworkHeader, NetworkTransport, Route};
use crate::logutil::hex_snippet;
use crate::serial::open_port;

pub struct RadioLink {
    port: Box<dyn SerialPort>,
    decoder: SlipDecoder,
    inbound: VecDeque<(NetworkHeader, Vec<u8>)>,
}

impl RadioLink {
    /// Open the modem port and announce channel and own address.
    pub async fn open(
        port_name: &str,
        baud_rate: u32,
        channel: u8,
        own: MeshAddress,
    ) -> Result<Self> {
        let port = open_port(port_name, baud_rate).await?;
        let mut link = Self {
            port,
            decoder: SlipDecoder::new(),
            inbound: VecDeque::new(),
        };
        link.write_frame(&RadioFrame::setup(own, channel))
            .map_err(|e| anyhow!("Failed to configure radio modem on {}: {}", port_name, e))?;
        info!(
            "Radio modem on {} configured: channel {} node {}",
            port_name, channel, own
        );
        Ok(link)
    }

    fn write_frame(&mut self, frame: &RadioFrame) -> io::Result<()> {
        let bytes = frame.encode();
        trace!("radio tx {}", hex_snippet(&bytes, 32));
        self.port.write_all(&bytes)?;
        self.port.flush()
    }

    fn fill(&mut self) {
        let available = match self.port.bytes_to_read() {
            Ok(0) => return,
            Ok(n) => n as usize,
            Err(e) => {
                warn!("radio bytes_to_read failed: {}", e);
                return;
            }
        };
        let mut buf = vec![0u8; available.min(1024)];
        let n = match self.port.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return,
            Err(e) => {
                warn!("radio read failed: {}", e);
                return;
            }
        };
        self.inbound
            .extend(wire::decode_packets(&mut self.decoder, &buf[..n]));
    }
}

impl NetworkTransport for RadioLink {
    fn send(&mut self, route: Route, tag: u8, payload: &[u8]) -> bool {
        match self.write_frame(&RadioFrame::outbound(route, tag, payload)) {
            Ok(()) => true,
            Err(e) => {
                warn!("radio send {:?} failed: {}", route, e);
                false
            }
        }
    }

    fn receive(&mut self) -> Option<(NetworkHeader, Vec<u8>)> {
        if self.inbound.is_empty() {
            self.fill();
        }
        self.inbound.pop_front()
    }
}
