//! # Radio Mesh Transport
//!
//! The relay only needs two primitives from the radio side: send a tagged payload
//! along a [`Route`], and poll for the next received packet. [`NetworkTransport`]
//! captures exactly that; retransmission and routing inside the mesh belong to the
//! transport, not to the relay.
//!
//! ## Implementations
//!
//! - [`MockNetwork`] - in-memory network used for tests and `--dry-run`
//! - [`radio::RadioLink`] - SLIP framed link to a radio modem (feature `serial`)
//!
//! ## Addressing
//!
//! Operators name pumps by logical id (0-15); [`AddressTable`] maps those ids to
//! [`MeshAddress`]es. See the [`address`] module for the factory layout.

use log::{debug, info};
use std::collections::VecDeque;

pub mod address;
#[cfg(feature = "serial")]
pub mod radio;
pub mod slip;
pub mod wire;

pub use address::{AddressTable, MeshAddress, DEFAULT_ADDRESSES, NODE_COUNT};

/// Tree depth a multicast descends from its base address.
pub const MULTICAST_LEVEL: u8 = 1;

/// Where an outbound packet goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Unicast(MeshAddress),
    /// Every node `level` hops below `base`.
    Multicast { base: MeshAddress, level: u8 },
}

/// Metadata of a packet received from the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkHeader {
    pub from: MeshAddress,
    pub tag: u8,
}

/// Non-blocking packet transport towards the pump mesh.
pub trait NetworkTransport {
    /// Transmit one packet. `true` when the transport accepted it.
    fn send(&mut self, route: Route, tag: u8, payload: &[u8]) -> bool;

    /// Next received packet, if any. Never blocks.
    fn receive(&mut self) -> Option<(NetworkHeader, Vec<u8>)>;
}

impl<T: NetworkTransport + ?Sized> NetworkTransport for Box<T> {
    fn send(&mut self, route: Route, tag: u8, payload: &[u8]) -> bool {
        (**self).send(route, tag, payload)
    }

    fn receive(&mut self) -> Option<(NetworkHeader, Vec<u8>)> {
        (**self).receive()
    }
}

/// A packet recorded by [`MockNetwork`].
#[derive(Clone, Debug, PartialEq)]
pub struct SentPacket {
    pub route: Route,
    pub tag: u8,
    pub payload: Vec<u8>,
}

/// In-memory network. Sends succeed unless failures were scheduled; received packets
/// are whatever was injected.
#[derive(Debug, Default)]
pub struct MockNetwork {
    sent: Vec<SentPacket>,
    inbound: VecDeque<(NetworkHeader, Vec<u8>)>,
    scripted: VecDeque<bool>,
    always_fail: bool,
    announce: bool,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dry-run network for the binary: every send is logged at info level.
    pub fn dry_run() -> Self {
        Self {
            announce: true,
            ..Self::default()
        }
    }

    /// Queue a packet to be returned by `receive`.
    pub fn inject(&mut self, from: MeshAddress, tag: u8, value: i32) {
        self.inject_raw(from, tag, wire::encode_value(value).to_vec());
    }

    pub fn inject_raw(&mut self, from: MeshAddress, tag: u8, payload: Vec<u8>) {
        self.inbound.push_back((NetworkHeader { from, tag }, payload));
    }

    /// Outcomes for the next sends, consumed in order before falling back to the
    /// default.
    pub fn script_results(&mut self, results: &[bool]) {
        self.scripted.extend(results.iter().copied());
    }

    pub fn set_always_fail(&mut self, fail: bool) {
        self.always_fail = fail;
    }

    pub fn sent(&self) -> &[SentPacket] {
        &self.sent
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }
}

impl NetworkTransport for MockNetwork {
    fn send(&mut self, route: Route, tag: u8, payload: &[u8]) -> bool {
        let ok = self.scripted.pop_front().unwrap_or(!self.always_fail);
        if self.announce {
            let decoded = wire::decode_command(payload);
            info!(
                "dry-run send {:?} tag='{}' command={:?}",
                route, tag as char, decoded
            );
        } else {
            debug!("mock send {:?} tag={} ok={}", route, tag, ok);
        }
        self.sent.push(SentPacket {
            route,
            tag,
            payload: payload.to_vec(),
        });
        ok
    }

    fn receive(&mut self) -> Option<(NetworkHeader, Vec<u8>)> {
        self.inbound.pop_front()
    }
}
