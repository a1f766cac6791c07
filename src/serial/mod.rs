//! # Operator Serial Link
//!
//! The relay reads commands from, and writes telemetry and fault lines to, a single
//! line-oriented link. [`SerialLink`] is the seam the relay engine talks to; it never
//! blocks on read and reports write failures as `io::Error` for the caller to log.
//!
//! Implementations:
//!
//! - [`StdioSerial`] - standard input/output (default when no port is configured)
//! - [`PortSerial`] - a hardware serial port (feature `serial`)
//! - [`MemorySerial`] - scripted in-memory link for tests and tooling

use std::collections::VecDeque;
use std::io::{self, Write};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

pub mod line;
#[cfg(feature = "serial")]
pub mod port;

pub use line::{LineBuffer, MAX_LINE_LEN};
#[cfg(feature = "serial")]
pub use port::{open_port, PortSerial};

/// Line-oriented operator link.
pub trait SerialLink {
    /// Next complete input line, without its terminator. Returns `None` immediately
    /// when nothing is ready.
    fn read_line(&mut self) -> Option<Vec<u8>>;

    /// Write one output line; the implementation appends the terminator.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

impl<T: SerialLink + ?Sized> SerialLink for Box<T> {
    fn read_line(&mut self) -> Option<Vec<u8>> {
        (**self).read_line()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }
}

/// In-memory link: lines pushed in are read back in order, lines written are kept.
#[derive(Debug, Default)]
pub struct MemorySerial {
    input: VecDeque<Vec<u8>>,
    output: Vec<String>,
    fail_writes: bool,
}

impl MemorySerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: &str) {
        self.input.push_back(line.as_bytes().to_vec());
    }

    pub fn push_bytes(&mut self, line: &[u8]) {
        self.input.push_back(line.to_vec());
    }

    /// Make every subsequent write fail with `BrokenPipe`.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn written(&self) -> &[String] {
        &self.output
    }

    pub fn take_written(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}

impl SerialLink for MemorySerial {
    fn read_line(&mut self) -> Option<Vec<u8>> {
        self.input.pop_front()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "serial link closed"));
        }
        self.output.push(line.to_string());
        Ok(())
    }
}

/// Standard input/output link. A background task feeds stdin lines through a channel
/// so `read_line` stays non-blocking.
pub struct StdioSerial {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl StdioSerial {
    /// Start the stdin reader task. Must be called from within a Tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut stdin = tokio::io::stdin();
            let mut lines = LineBuffer::new();
            let mut chunk = [0u8; 256];
            loop {
                match stdin.read(&mut chunk).await {
                    Ok(0) => {
                        log::info!("stdin closed; no further operator commands");
                        break;
                    }
                    Ok(n) => {
                        lines.push(&chunk[..n]);
                        while let Some(line) = lines.pop() {
                            if tx.send(line).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("stdin read error: {}", e);
                        break;
                    }
                }
            }
        });
        Self { rx }
    }
}

impl SerialLink for StdioSerial {
    fn read_line(&mut self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}
