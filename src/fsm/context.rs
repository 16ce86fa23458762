//! Shared mutable context threaded through every FSM handler.
//!
//! `ArmContext` is the single struct that state handlers read from and
//! write to: the last known module status, the current arm session,
//! configuration, the current time, and the per-tick outboxes (link
//! actions, telemetry events, reliability outcomes) that the orchestrator
//! drains after each tick.  Handlers never touch the link themselves.

use heapless::Vec;
use log::warn;

use crate::app::events::{CaptureCompletion, CompletionReason, LinkEvent};
use crate::app::immediate::LinkActivity;
use crate::config::LinkConfig;
use crate::protocol::{CaptureEvent, CaptureRequest, Command};
use crate::reliability::FailureCode;

const MAX_ACTIONS: usize = 8;
const MAX_EVENTS: usize = 16;
const MAX_FAILURES: usize = 4;

// ---------------------------------------------------------------------------
// Module status (written by message handling only)
// ---------------------------------------------------------------------------

/// Last known state of the companion module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleStatus {
    /// Short state tag, e.g. `"active"`, `"sleeping"`.  Empty until heard.
    pub state: String,
    /// Post-boot stabilisation finished.
    pub settled: bool,
    pub ip: Option<String>,
    pub stream_url: Option<String>,
    /// Firmware tag from the last `boot` notice.
    pub firmware: Option<String>,
    /// When any of the above last changed (ms).
    pub updated_at: Option<u64>,
}

impl ModuleStatus {
    pub fn is_active(&self) -> bool {
        self.state == "active"
    }
}

// ---------------------------------------------------------------------------
// Arm session
// ---------------------------------------------------------------------------

/// Pre-wake sub-phase while a capture waits in `Waking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreWakePhase {
    AwaitActive,
    AwaitSettled,
}

/// A capture that arrived while the module was asleep.
#[derive(Debug, Clone, PartialEq)]
pub struct PreWake {
    pub request: CaptureRequest,
    pub phase: PreWakePhase,
    pub deadline: u64,
    /// Last status poll sent while waiting.
    pub polled_at: u64,
}

/// The orchestrator's per-session state.  Reset on every return to `Idle`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArmSession {
    pub started_at: u64,
    // Milestones (ms).  Boot/ready/sleep are written on message arrival.
    pub wake_sent_at: Option<u64>,
    pub boot_seen_at: Option<u64>,
    pub ready_seen_at: Option<u64>,
    pub settle_due_at: Option<u64>,
    pub ready_since: Option<u64>,
    pub slept_at: Option<u64>,
    /// Wake pulses sent this session.
    pub retries: u8,

    // Capture
    pub capture_queued: bool,
    pub capture_sent_at: Option<u64>,
    /// Request waiting for the session to reach `Ready`.
    pub pending: Option<CaptureRequest>,
    pub trigger: Option<String>,
    pub metadata_only: bool,
    /// Earlier determination that replaces the trigger label as reason.
    pub reason_override: Option<CompletionReason>,
    /// `done` event received for the outstanding capture.
    pub done: Option<CaptureEvent>,
    pub prewake: Option<PreWake>,

    // Sleep
    pub sleep_in_flight: bool,
    pub sleep_sent_at: Option<u64>,
    pub sleep_attempts: u8,
}

impl ArmSession {
    /// A capture was written and neither completed nor abandoned.
    pub fn capture_outstanding(&self, now_ms: u64, timeout_ms: u32) -> bool {
        self.capture_queued
            && self.done.is_none()
            && self
                .capture_sent_at
                .is_some_and(|t| now_ms < t + u64::from(timeout_ms))
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Link work requested by a handler, applied by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkAction {
    WakePulse,
    Send(Command),
}

// ---------------------------------------------------------------------------
// ArmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct ArmContext {
    // -- Timing --
    /// Current monotonic time (ms), set before every tick.
    pub now_ms: u64,
    /// When the current state was entered (ms).
    pub state_entered_ms: u64,

    // -- Configuration --
    pub config: LinkConfig,

    // -- Module view --
    pub status: ModuleStatus,
    pub activity: LinkActivity,

    // -- Session --
    pub session: ArmSession,
    /// Completion of the most recent session, kept across resets.
    pub last_completion: Option<CaptureCompletion>,

    // -- Outboxes (drained every tick) --
    pub actions: Vec<LinkAction, MAX_ACTIONS>,
    pub events: Vec<LinkEvent, MAX_EVENTS>,
    pub failures: Vec<FailureCode, MAX_FAILURES>,
    pub successes: u8,
}

impl ArmContext {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            now_ms: 0,
            state_entered_ms: 0,
            config,
            status: ModuleStatus::default(),
            activity: LinkActivity::default(),
            session: ArmSession::default(),
            last_completion: None,
            actions: Vec::new(),
            events: Vec::new(),
            failures: Vec::new(),
            successes: 0,
        }
    }

    /// Milliseconds spent in the current state.
    pub fn ms_in_state(&self) -> u64 {
        self.now_ms.saturating_sub(self.state_entered_ms)
    }

    /// `now` has reached `since + span`.
    pub fn elapsed(&self, since: u64, span_ms: u32) -> bool {
        self.now_ms >= since.saturating_add(u64::from(span_ms))
    }

    /// Fresh session starting now.
    pub fn begin_session(&mut self, now_ms: u64) {
        self.session = ArmSession {
            started_at: now_ms,
            ..ArmSession::default()
        };
    }

    /// Forget what the module last reported.  Used when a session ends
    /// without confirmation of where the module was left, so the next
    /// capture wakes it instead of trusting a stale `active`.
    pub fn mark_module_unknown(&mut self) {
        self.status.state = "unknown".into();
        self.status.settled = false;
        self.status.updated_at = Some(self.now_ms);
    }

    pub fn emit(&mut self, event: LinkEvent) {
        if let Err(ev) = self.events.push(event) {
            warn!("ARM: event outbox full, dropping {:?}", ev);
        }
    }

    pub fn request(&mut self, action: LinkAction) {
        if let Err(a) = self.actions.push(action) {
            warn!("ARM: action outbox full, dropping {:?}", a);
        }
    }

    pub fn fail(&mut self, code: FailureCode) {
        if self.failures.push(code).is_err() {
            warn!("ARM: failure outbox full, dropping {:?}", code);
        }
    }

    pub fn succeed(&mut self) {
        self.successes = self.successes.saturating_add(1);
    }

    /// Record a capture command as written: the session now waits for
    /// its `done` event.
    pub fn note_capture_issued(&mut self, request: &CaptureRequest) {
        self.session.capture_queued = true;
        self.session.capture_sent_at = Some(self.now_ms);
        self.session.trigger = Some(request.trigger.clone());
        self.session.done = None;
        self.session.pending = None;
        self.session.prewake = None;
        self.emit(LinkEvent::CaptureRequested {
            trigger: request.trigger.clone(),
        });
    }

    /// Queue a capture write for the orchestrator and mark it issued.
    pub fn issue_capture(&mut self, request: CaptureRequest) {
        self.note_capture_issued(&request);
        self.request(LinkAction::Send(Command::Capture(request)));
    }

    /// Close out the session's capture with `reason`.  An earlier
    /// metadata-only determination overrides a plain trigger label.
    pub fn complete(&mut self, reason: CompletionReason, ok: Option<bool>) {
        let reason = match reason {
            CompletionReason::Trigger(label) => self
                .session
                .reason_override
                .take()
                .unwrap_or(CompletionReason::Trigger(label)),
            other => other,
        };
        let media_captured = ok == Some(true) && !self.session.metadata_only;
        let completion = CaptureCompletion {
            reason,
            media_captured,
            ok,
            trigger: self
                .session
                .trigger
                .clone()
                .or_else(|| self.session.pending.as_ref().map(|r| r.trigger.clone())),
        };
        self.session.capture_queued = false;
        self.emit(LinkEvent::CaptureDone(completion.clone()));
        self.last_completion = Some(completion);
    }

    /// End the session without media.
    pub fn complete_metadata_only(&mut self, reason: CompletionReason) {
        self.session.metadata_only = true;
        self.complete(reason, None);
    }
}
