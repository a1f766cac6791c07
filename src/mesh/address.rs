//! Logical node ids and the tree-structured mesh address table.
//!
//! Mesh addresses are written in octal, matching how the radio layer documents them.
//! The factory layout is a three level tree rooted at the master:
//!
//! ```text
//!  id   address
//!  0    00                         master (this relay)
//!  1-5  01 02 03 04 05             children of 00
//!  6-10 011 012 013 014 015        children of 01
//! 11-15 021 022 023 024 025        children of 02
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::fault::Fault;

/// Number of logical node ids the operator protocol can address.
pub const NODE_COUNT: usize = 16;

/// Physical address of a node in the radio mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshAddress(pub u16);

impl MeshAddress {
    pub const MASTER: MeshAddress = MeshAddress(0o0);

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for MeshAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0{:o}", self.0)
    }
}

/// Factory address layout.
pub const DEFAULT_ADDRESSES: [u16; NODE_COUNT] = [
    0o00, //
    0o01, 0o02, 0o03, 0o04, 0o05, //
    0o11, 0o12, 0o13, 0o14, 0o15, //
    0o21, 0o22, 0o23, 0o24, 0o25,
];

/// Immutable logical id → mesh address mapping, built once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressTable {
    entries: [MeshAddress; NODE_COUNT],
}

impl Default for AddressTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ADDRESSES.map(MeshAddress),
        }
    }
}

impl AddressTable {
    /// Build a table from configuration. Exactly 16 distinct addresses are required
    /// so the mapping stays one-to-one.
    pub fn from_entries(raw: &[u16]) -> Result<Self> {
        if raw.len() != NODE_COUNT {
            return Err(anyhow!(
                "address table must have {} entries, got {}",
                NODE_COUNT,
                raw.len()
            ));
        }
        let mut seen = HashSet::new();
        for addr in raw {
            if !seen.insert(*addr) {
                return Err(anyhow!("address table lists 0{:o} more than once", addr));
            }
        }
        let mut entries = [MeshAddress::MASTER; NODE_COUNT];
        for (slot, addr) in entries.iter_mut().zip(raw) {
            *slot = MeshAddress(*addr);
        }
        Ok(Self { entries })
    }

    /// Map a logical node id to its mesh address.
    pub fn resolve(&self, logical_id: u16) -> Result<MeshAddress, Fault> {
        self.entries
            .get(logical_id as usize)
            .copied()
            .ok_or(Fault::InvalidAddress)
    }

    /// Reverse lookup, used to label inbound traffic in logs.
    pub fn logical_id(&self, address: MeshAddress) -> Option<u16> {
        self.entries
            .iter()
            .position(|a| *a == address)
            .map(|i| i as u16)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, MeshAddress)> + '_ {
        self.entries.iter().enumerate().map(|(i, a)| (i as u16, *a))
    }
}
