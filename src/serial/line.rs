//! Incremental line assembly for byte-oriented serial input.

use log::warn;
use std::collections::VecDeque;

use crate::logutil::escape_bytes;

/// Longest command line accepted from the operator link. Anything past this is cut.
pub const MAX_LINE_LEN: usize = 50;

/// Splits a byte stream into lines on `\n`, dropping `\r` and empty lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    overflowed: bool,
    ready: VecDeque<Vec<u8>>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(MAX_LINE_LEN),
            overflowed: false,
            ready: VecDeque::new(),
        }
    }

    /// Feed raw bytes; completed lines become available through [`LineBuffer::pop`].
    pub fn push(&mut self, data: &[u8]) {
        for &b in data {
            match b {
                b'\n' => self.finish_line(),
                b'\r' => {}
                _ if self.buf.len() < MAX_LINE_LEN => self.buf.push(b),
                _ => self.overflowed = true,
            }
        }
    }

    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.ready.pop_front()
    }

    /// Bytes of the current partial line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn finish_line(&mut self) {
        let line = std::mem::take(&mut self.buf);
        if self.overflowed {
            warn!(
                "serial line exceeded {} bytes, truncated to '{}'",
                MAX_LINE_LEN,
                escape_bytes(&line)
            );
            self.overflowed = false;
        }
        if !line.is_empty() {
            self.ready.push_back(line);
        }
    }
}
