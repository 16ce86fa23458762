//! Unified error types for the feeder controller core.
//!
//! Every fallible operation exposed to the command layer returns one of the
//! named codes below.  All variants are `Copy` so they can be handed back to
//! the caller for acknowledgement and carried inside telemetry events without
//! allocation.  Timing failures inside the arm state machine are *not*
//! errors: they become state transitions and completion reasons.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The serial link or one of its control lines failed.
    Link(LinkError),
    /// `arm()` could not start a wake sequence.
    Arm(ArmError),
    /// A capture request was rejected or its pre-wake failed.
    Capture(CaptureError),
    /// An immediate operator command could not be issued.
    Command(CommandError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Arm(e) => write!(f, "arm: {e}"),
            Self::Capture(e) => write!(f, "capture: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Link errors (transport-local)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// `begin()` has not been called or the channel was closed.
    NotOpen,
    /// The serial write failed or was short.
    WriteFailed,
    /// Outbound message could not be serialized.
    EncodeFailed,
    /// No wake line is wired on this board.
    NoWakeLine,
    /// No power-enable line is wired on this board.
    NoPowerLine,
    /// Driving a control line failed at the GPIO level.
    PinFault,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen => write!(f, "channel not open"),
            Self::WriteFailed => write!(f, "serial write failed"),
            Self::EncodeFailed => write!(f, "message encode failed"),
            Self::NoWakeLine => write!(f, "no wake line configured"),
            Self::NoPowerLine => write!(f, "no power-enable line configured"),
            Self::PinFault => write!(f, "control line fault"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Arm errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmError {
    /// The wake pulse could not be driven; session stays idle.
    WakeLineUnavailable,
    /// Reliability gate: module is degraded or known absent.
    ModuleUnavailable,
}

impl fmt::Display for ArmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WakeLineUnavailable => write!(f, "wake line unavailable"),
            Self::ModuleUnavailable => write!(f, "module degraded or absent"),
        }
    }
}

impl From<ArmError> for Error {
    fn from(e: ArmError) -> Self {
        Self::Arm(e)
    }
}

// ---------------------------------------------------------------------------
// Capture errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// A snapshot result is still pending.
    SnapshotPending,
    /// A sleep command is in flight.
    SleepInFlight,
    /// A prior capture is still outstanding and has not timed out.
    CaptureOutstanding,
    /// The session is disarming and cannot accept new work.
    Disarming,
    /// Pre-wake: module never reported `active`.
    WakeTimeout,
    /// Pre-wake: module never reported `settled`.
    SettleTimeout,
    /// The capture command could not be written.
    WriteFailed,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SnapshotPending => write!(f, "snapshot pending"),
            Self::SleepInFlight => write!(f, "sleep in flight"),
            Self::CaptureOutstanding => write!(f, "capture outstanding"),
            Self::Disarming => write!(f, "session disarming"),
            Self::WakeTimeout => write!(f, "module did not wake"),
            Self::SettleTimeout => write!(f, "module did not settle"),
            Self::WriteFailed => write!(f, "capture write failed"),
        }
    }
}

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Self::Capture(e)
    }
}

// ---------------------------------------------------------------------------
// Immediate command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Another immediate operation is still open.
    Busy,
    /// A snapshot result is already pending.
    SnapshotPending,
    /// The command could not be written to the link.
    LinkDown,
    /// The wake line could not be driven.
    WakeLineUnavailable,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "immediate operation already open"),
            Self::SnapshotPending => write!(f, "snapshot pending"),
            Self::LinkDown => write!(f, "link down"),
            Self::WakeLineUnavailable => write!(f, "wake line unavailable"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
