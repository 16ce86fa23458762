//! Outbound telemetry events.
//!
//! The [`Orchestrator`](super::service::Orchestrator) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish over MQTT, etc.

use core::fmt;

use crate::error::CaptureError;
use crate::fsm::StateId;
use crate::protocol::{CapturePhase, SnapshotResult, WifiResult};

use super::immediate::{ImmediateOp, ImmediateOutcome};

/// Structured events emitted by the link core.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The orchestrator has started (carries initial state).
    Started(StateId),

    /// The arm state machine moved between states.
    StateChanged { from: StateId, to: StateId },

    /// `arm()` accepted; a wake sequence is running.
    Armed,

    /// A wake pulse went out (1-based attempt within the session).
    WakePulseSent { attempt: u8 },

    /// `boot` lifecycle notice received.
    BootConfirmed { firmware: Option<String> },

    /// `ready` lifecycle notice received.
    ReadyDetected { camera: bool, stream: bool },

    /// Module confirmed settled; captures may proceed.
    Settled,

    /// A capture command was written to the module.
    CaptureRequested { trigger: String },

    /// Live capture progress (`start` / `progress` phases).
    CaptureProgress { phase: CapturePhase, index: u16, total: u16 },

    /// The capture session completed, with or without media.
    CaptureDone(CaptureCompletion),

    /// A capture request could not be carried out.
    CaptureFailed { trigger: String, error: CaptureError },

    /// A sleep command went out (1-based attempt).
    SleepRequested { attempt: u8 },

    /// A snapshot result arrived and is latched for collection.
    SnapshotReady(SnapshotResult),

    /// Wi-Fi provisioning result, forwarded unchanged.
    WifiResult(WifiResult),

    /// Module reported an error of its own.
    ModuleError { msg: String },

    /// A one-shot operator command finished.
    ImmediateFinished { op: ImmediateOp, outcome: ImmediateOutcome },

    /// Failure threshold crossed; module was power-cycled.
    Degraded { failures: u8 },

    /// A success cleared the degraded flag.
    Recovered,
}

/// Why a capture session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReason {
    /// Normal completion, named by the request's trigger label.
    Trigger(String),
    NeverReady,
    LateReadiness,
    CaptureTimedOut,
    ModuleSlept,
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger(label) => f.write_str(label),
            Self::NeverReady => f.write_str("no capture — module never became ready"),
            Self::LateReadiness => f.write_str("late readiness"),
            Self::CaptureTimedOut => f.write_str("capture timed out"),
            Self::ModuleSlept => f.write_str("module slept unexpectedly"),
        }
    }
}

/// Final record of one arm/capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureCompletion {
    pub reason: CompletionReason,
    /// Media was confirmed; `false` means a metadata-only visit record.
    pub media_captured: bool,
    /// The module's own `ok` flag, when a `done` event arrived.
    pub ok: Option<bool>,
    /// Trigger label of the capture, when one was requested.
    pub trigger: Option<String>,
}
