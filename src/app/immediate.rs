//! One-shot operator commands as short-lived sessions.
//!
//! `wake`, `sleep`, `status` and `snapshot` write their command and open a
//! session with a deadline.  Each tick the session is checked against the
//! activity timestamps kept by the orchestrator; the first matching reply
//! completes it, the deadline times it out.  Nothing blocks the pump.

use crate::config::LinkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateOp {
    Wake,
    Sleep,
    Status,
    Snapshot,
}

impl ImmediateOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::Wake => "wake",
            Self::Sleep => "sleep",
            Self::Status => "status",
            Self::Snapshot => "snapshot",
        }
    }

    pub fn timeout_ms(self, cfg: &LinkConfig) -> u32 {
        match self {
            Self::Wake => cfg.prewake_active_timeout_ms,
            Self::Sleep => cfg.sleep_ack_timeout_ms,
            Self::Status => cfg.status_timeout_ms,
            Self::Snapshot => cfg.snapshot_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateOutcome {
    Completed,
    TimedOut,
}

/// When each kind of reply was last seen (ms, monotonic).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkActivity {
    pub last_status_at: Option<u64>,
    /// Last status whose state tag was `active`.
    pub last_active_at: Option<u64>,
    pub last_boot_at: Option<u64>,
    pub last_ready_at: Option<u64>,
    pub last_sleep_at: Option<u64>,
    pub last_snapshot_at: Option<u64>,
}

impl LinkActivity {
    fn seen_since(ts: Option<u64>, since: u64) -> bool {
        ts.is_some_and(|t| t >= since)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImmediateSession {
    pub op: ImmediateOp,
    pub opened_at: u64,
    pub deadline: u64,
}

impl ImmediateSession {
    pub fn open(op: ImmediateOp, now_ms: u64, cfg: &LinkConfig) -> Self {
        Self {
            op,
            opened_at: now_ms,
            deadline: now_ms + u64::from(op.timeout_ms(cfg)),
        }
    }

    /// `Some` once the session is over.
    pub fn resolve(&self, activity: &LinkActivity, now_ms: u64) -> Option<ImmediateOutcome> {
        let since = self.opened_at;
        let done = match self.op {
            ImmediateOp::Wake => {
                LinkActivity::seen_since(activity.last_active_at, since)
                    || LinkActivity::seen_since(activity.last_boot_at, since)
                    || LinkActivity::seen_since(activity.last_ready_at, since)
            }
            ImmediateOp::Sleep => LinkActivity::seen_since(activity.last_sleep_at, since),
            ImmediateOp::Status => LinkActivity::seen_since(activity.last_status_at, since),
            ImmediateOp::Snapshot => LinkActivity::seen_since(activity.last_snapshot_at, since),
        };
        if done {
            Some(ImmediateOutcome::Completed)
        } else if now_ms >= self.deadline {
            Some(ImmediateOutcome::TimedOut)
        } else {
            None
        }
    }
}
