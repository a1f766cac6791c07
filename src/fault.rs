//! Fault taxonomy and the serial error reporter.
//!
//! Every fault the relay can observe maps to exactly one fixed line on the serial
//! channel. Faults are non-fatal and carry no state: the reporter writes the line,
//! logs it, and the control loop carries on.
//!
//! Pump nodes report their own faults over the radio as an `'E'` tagged packet whose
//! payload is one of the numeric codes below, so the numbering is part of the wire
//! contract and must not be reordered.

use log::warn;
use thiserror::Error;

use crate::serial::SerialLink;

/// Radio packet tag marking a remote fault report.
pub const ERROR_TAG: u8 = b'E';

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Outbound command queue at capacity; the new command was discarded.
    #[error("Error: network queue is full!")]
    NetworkQueueFull,

    /// A pump node's own command queue is full (reported remotely).
    #[error("Error: pump queue is full!")]
    PumpQueueFull,

    /// Serial line did not start with a known scope character.
    #[error("Error: unrecognized header!")]
    UnrecognizedHeader,

    /// Logical node id outside the address table.
    #[error("Error: invalid node address!")]
    InvalidAddress,

    /// Inbound relay queue at capacity; the newest record was discarded.
    #[error("Error: data queue is full!")]
    DataQueueFull,
}

impl Fault {
    /// Wire code carried in the payload of an `'E'` packet.
    pub fn code(self) -> i32 {
        match self {
            Fault::NetworkQueueFull => 0,
            Fault::PumpQueueFull => 1,
            Fault::UnrecognizedHeader => 2,
            Fault::InvalidAddress => 3,
            Fault::DataQueueFull => 4,
        }
    }

    /// Decode a remote fault code. Unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Fault::NetworkQueueFull),
            1 => Some(Fault::PumpQueueFull),
            2 => Some(Fault::UnrecognizedHeader),
            3 => Some(Fault::InvalidAddress),
            4 => Some(Fault::DataQueueFull),
            _ => None,
        }
    }
}

/// Write the fixed line for `fault` to the serial link.
///
/// A failing serial write is logged and swallowed; reporting never produces a
/// second fault.
pub fn report_fault<S: SerialLink + ?Sized>(serial: &mut S, fault: Fault) {
    warn!("fault: {:?}", fault);
    if let Err(e) = serial.write_line(&fault.to_string()) {
        warn!("serial write failed while reporting {:?}: {}", fault, e);
    }
}
