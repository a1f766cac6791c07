//! Byte layouts shared with the pump firmware and the radio modem.
//!
//! Command payloads use the actuator's native struct layout: a little-endian `f32`
//! speed followed by a little-endian `i32` position (8 bytes). Telemetry and fault
//! payloads are a single little-endian `i32`.
//!
//! Frames exchanged with the radio modem are SLIP encoded and carry:
//!
//! ```text
//! kind:u8  address:u16le  tag:u8  level:u8  payload:[u8]  crc16:u16le
//! ```
//!
//! `address` is the destination for outbound kinds and the source for `Packet`.
//! The CRC (CCITT/IBM-3740) covers every byte before it.

use crc::{Crc, CRC_16_IBM_3740};
use log::{debug, warn};
use thiserror::Error;

use super::slip::{self, SlipDecoder};
use super::{MeshAddress, NetworkHeader, Route};
use crate::command::Command;
use crate::logutil::hex_snippet;

pub const COMMAND_PAYLOAD_LEN: usize = 8;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);
const FRAME_HEADER_LEN: usize = 5;
const FRAME_MIN_LEN: usize = FRAME_HEADER_LEN + 2;

/// Encode a command in the actuator's struct layout.
pub fn encode_command(cmd: &Command) -> [u8; COMMAND_PAYLOAD_LEN] {
    let mut out = [0u8; COMMAND_PAYLOAD_LEN];
    out[..4].copy_from_slice(&cmd.speed.to_le_bytes());
    out[4..].copy_from_slice(&cmd.position.to_le_bytes());
    out
}

/// Decode a command payload; `None` if it is too short.
pub fn decode_command(data: &[u8]) -> Option<Command> {
    if data.len() < COMMAND_PAYLOAD_LEN {
        return None;
    }
    let speed = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let position = i32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    Some(Command { speed, position })
}

/// Read a telemetry value. Short payloads are zero-extended; extra bytes are ignored.
pub fn decode_value(data: &[u8]) -> i32 {
    let mut raw = [0u8; 4];
    let n = data.len().min(4);
    raw[..n].copy_from_slice(&data[..n]);
    i32::from_le_bytes(raw)
}

pub fn encode_value(value: i32) -> [u8; 4] {
    value.to_le_bytes()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Relay → modem: channel and own address, sent once after opening.
    Setup = 0x01,
    Unicast = 0x02,
    Multicast = 0x03,
    /// Modem → relay: a packet received from the mesh.
    Packet = 0x10,
}

impl FrameKind {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(FrameKind::Setup),
            0x02 => Some(FrameKind::Unicast),
            0x03 => Some(FrameKind::Multicast),
            0x10 => Some(FrameKind::Packet),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("crc mismatch: computed {computed:#06x}, frame carries {carried:#06x}")]
    BadCrc { computed: u16, carried: u16 },
    #[error("unknown frame kind {0:#04x}")]
    UnknownKind(u8),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RadioFrame {
    pub kind: FrameKind,
    pub address: MeshAddress,
    pub tag: u8,
    pub level: u8,
    pub payload: Vec<u8>,
}

impl RadioFrame {
    pub fn setup(own: MeshAddress, channel: u8) -> Self {
        Self {
            kind: FrameKind::Setup,
            address: own,
            tag: channel,
            level: 0,
            payload: Vec::new(),
        }
    }

    pub fn outbound(route: Route, tag: u8, payload: &[u8]) -> Self {
        let (kind, address, level) = match route {
            Route::Unicast(to) => (FrameKind::Unicast, to, 0),
            Route::Multicast { base, level } => (FrameKind::Multicast, base, level),
        };
        Self {
            kind,
            address,
            tag,
            level,
            payload: payload.to_vec(),
        }
    }

    /// Serialize, append the CRC and SLIP-encode.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(FRAME_MIN_LEN + self.payload.len());
        body.push(self.kind as u8);
        body.extend_from_slice(&self.address.raw().to_le_bytes());
        body.push(self.tag);
        body.push(self.level);
        body.extend_from_slice(&self.payload);
        let crc = CRC16.checksum(&body);
        body.extend_from_slice(&crc.to_le_bytes());
        slip::encode(&body)
    }

    /// Parse one already SLIP-decoded frame.
    pub fn decode(frame: &[u8]) -> Result<Self, WireError> {
        if frame.len() < FRAME_MIN_LEN {
            return Err(WireError::TooShort(frame.len()));
        }
        let (body, trailer) = frame.split_at(frame.len() - 2);
        let carried = u16::from_le_bytes([trailer[0], trailer[1]]);
        let computed = CRC16.checksum(body);
        if carried != computed {
            return Err(WireError::BadCrc { computed, carried });
        }
        let kind = FrameKind::from_u8(body[0]).ok_or(WireError::UnknownKind(body[0]))?;
        Ok(Self {
            kind,
            address: MeshAddress(u16::from_le_bytes([body[1], body[2]])),
            tag: body[3],
            level: body[4],
            payload: body[FRAME_HEADER_LEN..].to_vec(),
        })
    }

    /// A received mesh packet, if this is a `Packet` frame.
    pub fn into_packet(self) -> Option<(NetworkHeader, Vec<u8>)> {
        match self.kind {
            FrameKind::Packet => Some((
                NetworkHeader {
                    from: self.address,
                    tag: self.tag,
                },
                self.payload,
            )),
            _ => None,
        }
    }
}

/// Feed raw modem bytes through `decoder` and return the mesh packets they complete.
/// Frames of other kinds and frames that fail to parse are logged and skipped.
pub fn decode_packets(decoder: &mut SlipDecoder, bytes: &[u8]) -> Vec<(NetworkHeader, Vec<u8>)> {
    let mut packets = Vec::new();
    for raw in decoder.push(bytes) {
        match RadioFrame::decode(&raw) {
            Ok(frame) => {
                let kind = frame.kind;
                match frame.into_packet() {
                    Some(packet) => packets.push(packet),
                    None => debug!("radio: ignoring {:?} frame from modem", kind),
                }
            }
            Err(e) => warn!("radio: bad frame {} ({})", hex_snippet(&raw, 16), e),
        }
    }
    packets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_layout_is_speed_then_position() {
        let bytes = encode_command(&Command {
            speed: 250.0,
            position: -2,
        });
        assert_eq!(&bytes[..4], &250.0f32.to_le_bytes());
        assert_eq!(&bytes[4..], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            decode_command(&bytes),
            Some(Command {
                speed: 250.0,
                position: -2
            })
        );
        assert_eq!(decode_command(&bytes[..7]), None);
    }

    #[test]
    fn short_values_zero_extend() {
        assert_eq!(decode_value(&[]), 0);
        assert_eq!(decode_value(&[0x2A]), 42);
        assert_eq!(decode_value(&[0x01, 0x00, 0x00, 0x00, 0xFF]), 1);
        assert_eq!(decode_value(&encode_value(-1500)), -1500);
    }

    #[test]
    fn frame_survives_slip_with_special_bytes() {
        let frame = RadioFrame::outbound(
            Route::Multicast {
                base: MeshAddress(0o1),
                level: 1,
            },
            b'G',
            &[0xC0, 0xDB, 0x00],
        );
        let encoded = frame.encode();
        let mut dec = slip::SlipDecoder::new();
        let frames = dec.push(&encoded);
        assert_eq!(frames.len(), 1);
        assert_eq!(RadioFrame::decode(&frames[0]), Ok(frame));
    }

    #[test]
    fn corrupted_frame_is_rejected() {
        let frame = RadioFrame::setup(MeshAddress::MASTER, 90);
        let mut dec = slip::SlipDecoder::new();
        let mut raw = dec.push(&frame.encode()).remove(0);
        raw[3] ^= 0x01;
        assert!(matches!(
            RadioFrame::decode(&raw),
            Err(WireError::BadCrc { .. })
        ));
        assert_eq!(RadioFrame::decode(&[1, 2, 3]), Err(WireError::TooShort(3)));
    }

    fn packet_frame(from: u16, tag: u8, value: i32) -> RadioFrame {
        RadioFrame {
            kind: FrameKind::Packet,
            address: MeshAddress(from),
            tag,
            level: 0,
            payload: encode_value(value).to_vec(),
        }
    }

    #[test]
    fn modem_stream_yields_only_packets() {
        let mut stream = packet_frame(0o12, b'P', 300).encode();
        stream.extend(RadioFrame::setup(MeshAddress::MASTER, 90).encode());
        stream.extend(packet_frame(0o3, b'E', 2).encode());

        let mut decoder = SlipDecoder::new();
        let packets = decode_packets(&mut decoder, &stream);
        assert_eq!(packets.len(), 2);
        assert_eq!(
            packets[0].0,
            NetworkHeader {
                from: MeshAddress(0o12),
                tag: b'P'
            }
        );
        assert_eq!(decode_value(&packets[0].1), 300);
        assert_eq!(packets[1].0.tag, b'E');
        assert_eq!(decode_value(&packets[1].1), 2);
    }

    #[test]
    fn corrupted_frame_is_dropped_and_stream_recovers() {
        let mut bad = packet_frame(0o4, b'P', 7).encode();
        // flip a payload byte; the CRC no longer matches
        bad[6] ^= 0x01;
        let good = packet_frame(0o5, b'P', 8).encode();

        let mut decoder = SlipDecoder::new();
        assert!(decode_packets(&mut decoder, &bad).is_empty());
        let packets = decode_packets(&mut decoder, &good);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].0.from, MeshAddress(0o5));
    }

    #[test]
    fn packet_split_across_reads() {
        let bytes = packet_frame(0o21, b'S', -9).encode();
        let (a, b) = bytes.split_at(bytes.len() / 2);
        let mut decoder = SlipDecoder::new();
        assert!(decode_packets(&mut decoder, a).is_empty());
        let packets = decode_packets(&mut decoder, b);
        assert_eq!(packets.len(), 1);
        assert_eq!(decode_value(&packets[0].1), -9);
    }

    #[test]
    fn outbound_kinds_are_not_packets() {
        let frame = RadioFrame::outbound(Route::Unicast(MeshAddress(0o3)), b'G', &[1, 2]);
        assert!(frame.into_packet().is_none());
    }
}
