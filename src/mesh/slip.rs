//! SLIP framing (RFC 1055) for the radio modem link.

use log::trace;

pub const END: u8 = 0xC0;
pub const ESC: u8 = 0xDB;
pub const ESC_END: u8 = 0xDC;
pub const ESC_ESC: u8 = 0xDD;

/// Frames larger than this are discarded as line noise.
pub const MAX_FRAME: usize = 256;

/// Incremental decoder; bytes may arrive in arbitrary chunks.
#[derive(Debug, Default)]
pub struct SlipDecoder {
    buf: Vec<u8>,
    esc: bool,
    corrupt: bool,
}

impl SlipDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and collect every frame completed by them. Frames with a bad
    /// escape sequence or over [`MAX_FRAME`] bytes are dropped whole.
    pub fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &b in data {
            if b == END {
                let frame = std::mem::take(&mut self.buf);
                if self.corrupt {
                    trace!("slip: dropped corrupt frame ({} bytes)", frame.len());
                } else if !frame.is_empty() {
                    frames.push(frame);
                }
                self.esc = false;
                self.corrupt = false;
                continue;
            }
            if self.corrupt {
                continue;
            }
            let byte = if self.esc {
                self.esc = false;
                match b {
                    ESC_END => END,
                    ESC_ESC => ESC,
                    _ => {
                        self.corrupt = true;
                        continue;
                    }
                }
            } else if b == ESC {
                self.esc = true;
                continue;
            } else {
                b
            };
            if self.buf.len() >= MAX_FRAME {
                self.corrupt = true;
                continue;
            }
            self.buf.push(byte);
        }
        frames
    }
}

/// Encode one frame, with a leading END to flush any noise on the line.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.push(END);
    for &b in payload {
        match b {
            END => out.extend_from_slice(&[ESC, ESC_END]),
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            _ => out.push(b),
        }
    }
    out.push(END);
    out
}
