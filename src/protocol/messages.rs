//! Inbound message kinds, discriminated by the `mini` field.

use serde::{Deserialize, Serialize};

/// Field that names the kind of every inbound line.
pub const DISCRIMINATOR: &str = "mini";

/// Every line the companion module may send.
///
/// Matched exhaustively by the orchestrator, so adding a kind here is a
/// compile error until it is handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mini", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Periodic or requested module state.
    Status(StatusReport),
    /// Single-shot still capture result.
    Snapshot(SnapshotResult),
    /// Multi-phase capture progress; `done` completes a capture request.
    Event(CaptureEvent),
    /// Wi-Fi provisioning outcome.  Older module firmware tags it
    /// `wifi_test`.
    #[serde(alias = "wifi_test")]
    WifiResult(WifiResult),
    /// Lifecycle: module firmware started.
    Boot(BootNotice),
    /// Lifecycle: camera and stream initialised.
    Ready(ReadyNotice),
    /// Lifecycle: module is entering deep sleep.
    SleepDeep(SleepNotice),
    /// Module-side fault report.
    Error(ModuleFault),
}

impl InboundMessage {
    /// Every accepted value of the discriminator field.
    pub const KINDS: [&'static str; 9] = [
        "status",
        "snapshot",
        "event",
        "wifi_result",
        "wifi_test",
        "boot",
        "ready",
        "sleep_deep",
        "error",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Snapshot(_) => "snapshot",
            Self::Event(_) => "event",
            Self::WifiResult(_) => "wifi_result",
            Self::Boot(_) => "boot",
            Self::Ready(_) => "ready",
            Self::SleepDeep(_) => "sleep_deep",
            Self::Error(_) => "error",
        }
    }

    /// Lifecycle notices and status reports prove the module is alive.
    pub fn proves_presence(&self) -> bool {
        matches!(
            self,
            Self::Status(_) | Self::Boot(_) | Self::Ready(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Short state tag: `"active"`, `"sleeping"`, `"booting"`, ...
    pub state: String,
    /// Post-boot stabilisation finished.
    #[serde(default)]
    pub settled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtsp: Option<String>,
}

impl StatusReport {
    pub fn new(state: &str, settled: bool) -> Self {
        Self {
            state: state.into(),
            settled,
            ip: None,
            rtsp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResult {
    pub ok: bool,
    #[serde(default)]
    pub bytes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub trigger: String,
}

/// Capture phases reported by the module.  Unknown tags decode as `Other`
/// so a newer module firmware never breaks the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePhase {
    Start,
    Progress,
    Done,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub phase: CapturePhase,
    #[serde(default)]
    pub trigger: String,
    /// 1-based index within a multi-shot sequence.
    #[serde(default)]
    pub index: u16,
    #[serde(default)]
    pub total: u16,
    /// Video seconds recorded so far.
    #[serde(default)]
    pub seconds: u16,
    #[serde(default)]
    pub ok: bool,
}

impl CaptureEvent {
    pub fn done(trigger: &str, ok: bool) -> Self {
        Self {
            phase: CapturePhase::Done,
            trigger: trigger.into(),
            index: 0,
            total: 0,
            seconds: 0,
            ok,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiResult {
    pub ok: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BootNotice {
    #[serde(default)]
    pub ts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadyNotice {
    #[serde(default)]
    pub ts: u64,
    #[serde(default)]
    pub camera: bool,
    #[serde(default)]
    pub stream: bool,
    /// Some module firmware reports settle state along with readiness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SleepNotice {
    #[serde(default)]
    pub ts: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleFault {
    #[serde(default)]
    pub msg: String,
}
