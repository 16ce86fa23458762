//! Line → [`InboundMessage`] decoding.
//!
//! The dispatcher returns a typed message instead of invoking callbacks; the
//! orchestrator matches on it exhaustively.  Bad input is counted, logged
//! and dropped.

use core::fmt;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use super::messages::{DISCRIMINATOR, InboundMessage};

/// Why a line was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not parseable as JSON.
    InvalidJson,
    /// Parsed, but not an object or no `mini` string field.
    MissingDiscriminator,
    /// `mini` names a kind this controller does not know.
    UnknownKind,
    /// Known kind, but required fields are missing or mistyped.
    BadFields,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson => write!(f, "invalid json"),
            Self::MissingDiscriminator => write!(f, "missing discriminator"),
            Self::UnknownKind => write!(f, "unknown kind"),
            Self::BadFields => write!(f, "bad fields"),
        }
    }
}

/// Stateless decoder plus drop accounting.
#[derive(Debug, Default)]
pub struct Dispatcher {
    decoded: u32,
    dropped: u32,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and decode one line.
    pub fn parse(line: &str) -> Result<InboundMessage, DecodeError> {
        let value: Value = serde_json::from_str(line).map_err(|_| DecodeError::InvalidJson)?;
        let kind = value
            .as_object()
            .and_then(|o| o.get(DISCRIMINATOR))
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingDiscriminator)?;
        if !InboundMessage::KINDS.contains(&kind) {
            return Err(DecodeError::UnknownKind);
        }
        InboundMessage::deserialize(value).map_err(|_| DecodeError::BadFields)
    }

    /// Decode one line; failures are logged and yield `None`.
    pub fn decode(&mut self, line: &str) -> Option<InboundMessage> {
        match Self::parse(line) {
            Ok(msg) => {
                self.decoded = self.decoded.wrapping_add(1);
                Some(msg)
            }
            Err(e) => {
                self.dropped = self.dropped.wrapping_add(1);
                warn!("LINK: dropped line ({}): {}", e, line);
                None
            }
        }
    }

    pub fn decoded(&self) -> u32 {
        self.decoded
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
