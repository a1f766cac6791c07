//! # Operator Commands
//!
//! One line on the operator link becomes one [`CommandToSend`]:
//!
//! ```text
//! <Scope>;<Tag>;[key=value[;key=value...]]
//!
//!  S;G;t=3;s=250.0;p=1500     run pump 3 to position 1500 at speed 250
//!  M;H                        home every pump below the hub
//! ```
//!
//! | key | meaning                 | type    | documented range     |
//! |-----|-------------------------|---------|----------------------|
//! | `t` | destination logical id  | integer | 0-15                 |
//! | `s` | speed                   | float   | 0.0-4000.0           |
//! | `p` | target position         | integer | -1,000,000-1,000,000 |
//!
//! Ranges are not enforced here; the pumps clamp with their limit switches.
//!
//! The tag is forwarded as-is. The pump firmware currently understands:
//!
//! | tag | action                   | tag | action                  |
//! |-----|--------------------------|-----|-------------------------|
//! | `Q` | add to pump queue        | `H` | home                    |
//! | `G` | go to absolute position  | `S` | stop                    |
//! | `C` | go to relative position  | `L` | report max length       |
//! | `F` | find max position        | `P` | report position         |
//! | `B` | find home position       | `M` | set max length          |
//! | `R` | run first queued command | `N` | set position            |
//! | `X` | clear pump queue         |     |                         |

use serde::{Serialize, Serializer};
use std::fmt;

pub mod parser;

pub use parser::{parse_command, parse_command_with, tokenize, Token};

/// Logical node every multicast is addressed to.
pub const MULTICAST_HUB: u16 = 1;

/// Whether a command targets one pump or a subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    Single,
    Multicast,
}

impl Scope {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'S' => Some(Scope::Single),
            b'M' => Some(Scope::Multicast),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Single => f.write_str("SINGLE"),
            Scope::Multicast => f.write_str("MULTICAST"),
        }
    }
}

/// Physical actuator target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Command {
    pub speed: f32,
    pub position: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Logical node id. Values that do not fit a `u16` are stored as `u16::MAX`.
    pub destination: u16,
    #[serde(serialize_with = "tag_as_char")]
    pub command_type: u8,
}

/// A parsed operator command. Deliberately not `Clone`: it is moved from queue to
/// transport and exists in one place at a time.
#[derive(Debug, PartialEq, Serialize)]
pub struct CommandToSend {
    pub command: Command,
    pub header: Header,
    pub scope: Scope,
}

impl CommandToSend {
    /// Human readable dump written ahead of a send when command echo is enabled.
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("scope: {}", self.scope),
            format!("type: {}", self.header.command_type as char),
            format!("to: {}", self.header.destination),
            format!("speed: {:.2}", self.command.speed),
            format!("position: {}", self.command.position),
        ]
    }
}

fn tag_as_char<S: Serializer>(tag: &u8, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_char(*tag as char)
}
