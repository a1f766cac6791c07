//! Hardware serial port support.

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use tokio::time::{sleep, Duration};

use super::{LineBuffer, SerialLink};

/// Open a serial port with 8N1 framing and discard any startup chatter.
pub async fn open_port(port_name: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>> {
    debug!("Opening serial port {} at {} baud", port_name, baud_rate);

    let mut builder = serialport::new(port_name, baud_rate).timeout(Duration::from_millis(10));
    #[cfg(unix)]
    {
        builder = builder
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None);
    }
    let mut port = builder
        .open()
        .map_err(|e| anyhow!("Failed to open serial port {}: {}", port_name, e))?;

    // Arduino-class boards reset on DTR; give them a moment before purging
    let _ = port.write_data_terminal_ready(true);
    let _ = port.write_request_to_send(true);
    sleep(Duration::from_millis(150)).await;

    let mut purge_buf = [0u8; 512];
    if let Ok(available) = port.bytes_to_read() {
        if available > 0 {
            let n = port.read(&mut purge_buf).unwrap_or(0);
            debug!("Purged {} stale bytes from {}", n, port_name);
        }
    }
    Ok(port)
}

/// Operator link over a hardware serial port.
pub struct PortSerial {
    port: Box<dyn SerialPort>,
    lines: LineBuffer,
}

impl PortSerial {
    pub async fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = open_port(port_name, baud_rate).await?;
        info!("Operator serial link on {} at {} baud", port_name, baud_rate);
        Ok(Self {
            port,
            lines: LineBuffer::new(),
        })
    }

    fn fill(&mut self) {
        let available = match self.port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => {
                warn!("serial bytes_to_read failed: {}", e);
                return;
            }
        };
        if available == 0 {
            return;
        }
        let mut buf = vec![0u8; available.min(1024)];
        match self.port.read(&mut buf) {
            Ok(n) => self.lines.push(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => warn!("serial read failed: {}", e),
        }
    }
}

impl SerialLink for PortSerial {
    fn read_line(&mut self) -> Option<Vec<u8>> {
        if let Some(line) = self.lines.pop() {
            return Some(line);
        }
        self.fill();
        self.lines.pop()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\r\n")?;
        self.port.flush()
    }
}
