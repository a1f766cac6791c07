//! Logging helpers that keep raw serial and radio data readable on a single log line.

use std::fmt::Write;

/// Longest preview emitted for one value; longer input is cut with an ellipsis.
const MAX_PREVIEW: usize = 120;

/// Escape raw bytes for single-line logging.
///
/// Printable ASCII passes through, `\n` `\r` `\t` and backslash get their usual
/// escapes, and every other byte is shown as `\xNN`.
pub fn escape_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().min(MAX_PREVIEW) + 8);
    for (count, &b) in data.iter().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(&mut out, "\\x{:02X}", b);
            }
        }
    }
    out
}

/// Lowercase hex dump of at most `max` bytes, for frame-level trace logs.
pub fn hex_snippet(data: &[u8], max: usize) -> String {
    data.iter()
        .take(max)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join("")
}
