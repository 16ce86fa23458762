//! Outbound commands, tagged by the `op` field.

use serde::{Deserialize, Serialize};

/// Everything the controller may write to the companion module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Wake,
    Sleep,
    Status,
    Snapshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger: Option<String>,
    },
    Capture(CaptureRequest),
    StageWifi {
        ssid: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        psk: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        token: String,
    },
    CommitWifi {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        token: String,
    },
    AbortWifi {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        token: String,
    },
}

impl Command {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Wake => "wake",
            Self::Sleep => "sleep",
            Self::Status => "status",
            Self::Snapshot { .. } => "snapshot",
            Self::Capture(_) => "capture",
            Self::StageWifi { .. } => "stage_wifi",
            Self::CommitWifi { .. } => "commit_wifi",
            Self::AbortWifi { .. } => "abort_wifi",
        }
    }

    /// Copy safe to log or keep in the traffic ring: Wi-Fi secrets masked.
    pub fn redacted(&self) -> Self {
        match self {
            Self::StageWifi { ssid, psk, token } => Self::StageWifi {
                ssid: ssid.clone(),
                psk: if psk.is_empty() {
                    String::new()
                } else {
                    "***".into()
                },
                token: token.clone(),
            },
            other => other.clone(),
        }
    }
}

/// One capture order: stills, video and the label that names why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    #[serde(rename = "count")]
    pub snapshot_count: u8,
    #[serde(rename = "seconds")]
    pub video_seconds: u16,
    pub trigger: String,
    /// Weight change that prompted the capture, grams.
    #[serde(
        rename = "weight_delta",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub weight_hint: Option<f32>,
}

impl CaptureRequest {
    pub fn new(snapshot_count: u8, video_seconds: u16, trigger: &str, weight_hint: Option<f32>) -> Self {
        Self {
            snapshot_count,
            video_seconds,
            trigger: trigger.into(),
            weight_hint,
        }
    }
}
