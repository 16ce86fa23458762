//! Inbound commands to the orchestrator.
//!
//! These represent actions requested by the outside world (visit detection,
//! operator console, MQTT) that the
//! [`Orchestrator`](super::service::Orchestrator) interprets and acts upon.

use crate::config::LinkConfig;
use crate::protocol::CaptureRequest;

/// Commands that external adapters can send into the link core.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCommand {
    /// Start the wake-and-prepare sequence ahead of a visit.
    Arm,
    /// Capture stills and video.
    Capture(CaptureRequest),
    /// One-shot: wake the module.
    Wake,
    /// One-shot: put the module to sleep.
    Sleep,
    /// One-shot: query module status.
    Status,
    /// One-shot: take a single still.
    Snapshot,
    StageWifi { ssid: String, psk: String, token: String },
    CommitWifi { token: String },
    AbortWifi { token: String },
    /// Hot-reload configuration (validated first).
    UpdateConfig(LinkConfig),
}

/// Success codes handed back for acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAck {
    /// Wake sequence started.
    Armed,
    /// A session was already running; nothing changed.
    AlreadyArmed,
    /// Capture command written.
    CaptureIssued,
    /// Capture will be written once the session reaches `Ready`.
    CaptureQueued,
    /// Module was asleep; capture follows the pre-wake.
    CaptureAfterWake,
    /// One-shot command written; its outcome arrives as an event.
    Queued,
    /// Request folded into the running arm session.
    JoinedSession,
    /// Configuration accepted.
    ConfigApplied,
}
