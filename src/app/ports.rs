//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator (domain)
//! ```
//!
//! Driven adapters (serial link, event sinks, storage) implement these
//! traits.  The [`Orchestrator`](super::service::Orchestrator) consumes them
//! via generics, so the domain core never touches hardware directly.
//!
//! ## Notes
//!
//! - `ConfigPort::save` validates; nothing out of range reaches storage.
//! - All port errors are typed: callers must handle every variant explicitly.

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::protocol::{Command, InboundMessage};

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: domain ↔ companion module)
// ───────────────────────────────────────────────────────────────

/// The orchestrator's view of the companion-module link.
///
/// Every call takes the current monotonic time so implementations can
/// timestamp traffic without owning a clock.
pub trait LinkPort {
    /// `true` once the channel has been opened.
    fn is_open(&self) -> bool;

    /// Drain available bytes without blocking, handing each decoded
    /// message to `on_message` in arrival order.  Returns the number of
    /// messages delivered.
    fn pump_once(&mut self, now_ms: u64, on_message: &mut dyn FnMut(InboundMessage)) -> usize;

    /// Serialize `cmd` and write it as one line.
    fn write_message(&mut self, now_ms: u64, cmd: &Command) -> Result<(), LinkError>;

    /// Drive the wake line active for `duration_ms`, then inactive.
    fn wake_line_pulse(&mut self, now_ms: u64, duration_ms: u32) -> Result<(), LinkError>;

    /// Cut module power for `off_ms`, restore it, then wait `on_delay_ms`.
    fn power_cycle(&mut self, now_ms: u64, off_ms: u32, on_delay_ms: u32) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → log / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`LinkEvent`](super::events::LinkEvent)s
/// through this port; the adapter picks the destination.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::LinkEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Loads and persists link configuration.
///
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`], not
/// silently clamped.  A zero boot timeout or a settle delay longer than
/// its own timeout would otherwise wedge the arm sequence.
pub trait ConfigPort {
    /// Stored configuration, or defaults when nothing was saved yet.
    fn load(&self) -> Result<LinkConfig, ConfigError>;

    /// Validate, then persist.
    fn save(&self, config: &LinkConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Why a config load or save failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The stored blob does not decode, or decodes out of range.
    Corrupted,
    /// Rejected by [`LinkConfig::validate`]; names the offending field.
    ValidationFailed(&'static str),
    /// No room left in the namespace.
    StorageFull,
    /// Partition or namespace could not be opened, read or written.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => f.write_str("stored link config corrupted"),
            Self::ValidationFailed(field) => write!(f, "invalid link config: {}", field),
            Self::StorageFull => f.write_str("config storage full"),
            Self::IoError => f.write_str("config storage I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}
