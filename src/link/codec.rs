//! Newline line codec.
//!
//! Wire format:
//! ```text
//! ┌──────────────────────────────┬────┐
//! │ UTF-8 JSON object (≤ 255 B)  │ \n │
//! └──────────────────────────────┴────┘
//! ```
//!
//! The assembler accumulates incoming bytes and yields complete lines.  A
//! single `SerialPort::read` may return part of a line or several lines
//! concatenated.  `\r` is ignored so CRLF senders work unchanged.

use heapless::{String, Vec};

use crate::error::LinkError;
use crate::protocol::Command;

/// Receive buffer size.  A line that does not fit is discarded.
pub const RX_BUF_SIZE: usize = 256;

/// Result of feeding one byte that ended (or killed) a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A complete, non-empty line without its terminator.
    Line(String<RX_BUF_SIZE>),
    /// The line outgrew the buffer; bytes up to the next `\n` are dropped.
    Overflow,
    /// The line was complete but not valid UTF-8.
    NotUtf8,
}

/// Streaming line assembler.
pub struct LineAssembler {
    buf: Vec<u8, RX_BUF_SIZE>,
    /// Set after an overflow until the next terminator.
    discarding: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            discarding: false,
        }
    }

    /// Feed one byte.  Returns `Some` only when a line ends or overflows.
    pub fn push(&mut self, byte: u8) -> Option<LineOutcome> {
        match byte {
            b'\r' => None,
            b'\n' => {
                if self.discarding {
                    self.discarding = false;
                    return None;
                }
                if self.buf.is_empty() {
                    return None;
                }
                let bytes = core::mem::take(&mut self.buf);
                match String::from_utf8(bytes) {
                    Ok(line) => Some(LineOutcome::Line(line)),
                    Err(_) => Some(LineOutcome::NotUtf8),
                }
            }
            _ if self.discarding => None,
            _ => {
                if self.buf.push(byte).is_err() {
                    self.buf.clear();
                    self.discarding = true;
                    return Some(LineOutcome::Overflow);
                }
                None
            }
        }
    }

    /// Bytes of the line currently being assembled.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Drop any partial line (e.g. after the channel is reopened).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}

/// Serialize a command as one wire line, terminator included.
pub fn encode_command(cmd: &Command) -> Result<std::string::String, LinkError> {
    let mut line = serde_json::to_string(cmd).map_err(|_| LinkError::EncodeFailed)?;
    line.push('\n');
    Ok(line)
}
