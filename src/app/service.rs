//! Orchestrator: the hexagonal core.
//!
//! [`Orchestrator`] owns the arm FSM, the reliability manager and the shared
//! context.  It exposes a clean, hardware-agnostic API.  All I/O flows
//! through port traits injected at call sites, making the whole core
//! testable with mock adapters.
//!
//! ```text
//!                 ┌────────────────────────────┐
//!  LinkPort ◀───▶ │        Orchestrator         │ ──▶ EventSink
//!                 │  FSM · Reliability · Inbox  │
//!                 └────────────────────────────┘
//! ```
//!
//! Every operation takes the current monotonic time; nothing blocks.

use log::{debug, error, info, warn};

use crate::config::LinkConfig;
use crate::error::{ArmError, CaptureError, CommandError, Error, Result};
use crate::fsm::context::{ArmContext, ArmSession, LinkAction, ModuleStatus, PreWake, PreWakePhase};
use crate::fsm::states::build_state_table;
use crate::fsm::{ArmMachine, StateId, Transition};
use crate::protocol::{CapturePhase, CaptureRequest, Command, InboundMessage, SnapshotResult};
use crate::reliability::{Escalation, FailureCode, ReliabilityManager};

use super::commands::{CommandAck, LinkCommand};
use super::events::{CaptureCompletion, LinkEvent};
use super::immediate::{ImmediateOp, ImmediateOutcome, ImmediateSession};
use super::ports::{ConfigPort, EventSink, LinkPort};

/// Action/transition rounds applied per flush.  A forced transition can
/// queue new actions; this bounds the cascade.
const MAX_FLUSH_ROUNDS: usize = 4;

// ───────────────────────────────────────────────────────────────
// Orchestrator
// ───────────────────────────────────────────────────────────────

/// Arm/capture orchestration for one companion-module link.
pub struct Orchestrator {
    fsm: ArmMachine,
    ctx: ArmContext,
    reliability: ReliabilityManager,
    /// Open one-shot operator command, if any.
    immediate: Option<ImmediateSession>,
    /// Latest snapshot result, held until taken.
    snapshot: Option<SnapshotResult>,
    tick_count: u64,
}

impl Orchestrator {
    /// Construct the orchestrator from configuration.
    ///
    /// Does **not** start the FSM: call [`start`](Self::start) next.
    pub fn new(config: LinkConfig) -> Self {
        let reliability = ReliabilityManager::new(&config);
        let ctx = ArmContext::new(config);
        let fsm = ArmMachine::new(build_state_table(), StateId::Idle);
        Self {
            fsm,
            ctx,
            reliability,
            immediate: None,
            snapshot: None,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.ctx.now_ms = now_ms;
        self.fsm.start(&mut self.ctx);
        sink.emit(&LinkEvent::Started(self.fsm.current_state()));
        info!("ARM: orchestrator started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one cycle: pump link → apply messages → resolve one-shot
    /// commands → FSM → link actions → events and reliability.
    pub fn tick(&mut self, now_ms: u64, link: &mut impl LinkPort, sink: &mut impl EventSink) {
        self.tick_count += 1;
        self.ctx.now_ms = now_ms;

        // 1. Drain inbound messages in arrival order
        let mut inbox = Vec::new();
        link.pump_once(now_ms, &mut |msg| inbox.push(msg));
        for msg in inbox {
            self.handle_message(msg, now_ms, sink);
        }

        // 2. One-shot command deadlines
        self.resolve_immediate(now_ms);

        // 3. FSM tick (pure state logic)
        if let Some(Transition { from, to }) = self.fsm.tick(&mut self.ctx) {
            self.ctx.emit(LinkEvent::StateChanged { from, to });
        }

        // 4. Link actions, events, reliability
        self.flush(link, sink);
    }

    /// Apply one inbound message to the module view and the session.
    ///
    /// Called by [`tick`](Self::tick) for everything the link delivers;
    /// public so adapters with their own receive path can inject.
    pub fn handle_message(&mut self, msg: InboundMessage, now_ms: u64, sink: &mut impl EventSink) {
        self.ctx.now_ms = now_ms;
        let in_session = self.fsm.current_state().is_session_active();
        if msg.proves_presence() {
            self.reliability.mark_heard();
        }

        match msg {
            InboundMessage::Status(report) => {
                debug!(
                    "ARM: status state={} settled={}",
                    report.state, report.settled
                );
                let status = &mut self.ctx.status;
                status.state = report.state;
                status.settled = report.settled;
                if report.ip.is_some() {
                    status.ip = report.ip;
                }
                if report.rtsp.is_some() {
                    status.stream_url = report.rtsp;
                }
                status.updated_at = Some(now_ms);
                self.ctx.activity.last_status_at = Some(now_ms);
                if self.ctx.status.is_active() {
                    self.ctx.activity.last_active_at = Some(now_ms);
                }
            }
            InboundMessage::Snapshot(result) => {
                self.ctx.activity.last_snapshot_at = Some(now_ms);
                if result.ok {
                    info!("ARM: snapshot {} bytes", result.bytes);
                    self.record_success(sink);
                } else {
                    warn!("ARM: snapshot failed");
                }
                sink.emit(&LinkEvent::SnapshotReady(result.clone()));
                self.snapshot = Some(result);
            }
            InboundMessage::Event(ev) => match ev.phase {
                CapturePhase::Done => {
                    if self.ctx.session.capture_queued {
                        if ev.ok {
                            self.record_success(sink);
                        }
                        self.ctx.session.done = Some(ev);
                    } else {
                        info!("ARM: 'done' for '{}' with no capture outstanding", ev.trigger);
                    }
                }
                phase => sink.emit(&LinkEvent::CaptureProgress {
                    phase,
                    index: ev.index,
                    total: ev.total,
                }),
            },
            InboundMessage::WifiResult(result) => {
                info!("ARM: wifi {} ok={} {}", result.op, result.ok, result.reason);
                sink.emit(&LinkEvent::WifiResult(result));
            }
            InboundMessage::Boot(notice) => {
                info!(
                    "ARM: module boot (fw {})",
                    notice.fw.as_deref().unwrap_or("?")
                );
                let status = &mut self.ctx.status;
                status.state = "booting".into();
                status.settled = false;
                status.firmware.clone_from(&notice.fw);
                status.updated_at = Some(now_ms);
                self.ctx.activity.last_boot_at = Some(now_ms);
                if in_session {
                    self.ctx.session.boot_seen_at = Some(now_ms);
                    // A sleep_deep from before this boot is stale.
                    self.ctx.session.slept_at = None;
                }
                sink.emit(&LinkEvent::BootConfirmed { firmware: notice.fw });
                self.record_success(sink);
            }
            InboundMessage::Ready(notice) => {
                info!(
                    "ARM: module ready camera={} stream={}",
                    notice.camera, notice.stream
                );
                let status = &mut self.ctx.status;
                status.state = "active".into();
                if let Some(settled) = notice.settled {
                    status.settled = settled;
                }
                status.updated_at = Some(now_ms);
                self.ctx.activity.last_ready_at = Some(now_ms);
                self.ctx.activity.last_active_at = Some(now_ms);
                if in_session {
                    self.ctx.session.ready_seen_at = Some(now_ms);
                    self.ctx.session.slept_at = None;
                }
                sink.emit(&LinkEvent::ReadyDetected {
                    camera: notice.camera,
                    stream: notice.stream,
                });
                self.record_success(sink);
            }
            InboundMessage::SleepDeep(_) => {
                info!("ARM: module entering deep sleep");
                let status = &mut self.ctx.status;
                status.state = "sleeping".into();
                status.settled = false;
                status.updated_at = Some(now_ms);
                self.ctx.activity.last_sleep_at = Some(now_ms);
                if in_session {
                    self.ctx.session.slept_at = Some(now_ms);
                }
            }
            InboundMessage::Error(fault) => {
                warn!("ARM: module error: {}", fault.msg);
                sink.emit(&LinkEvent::ModuleError { msg: fault.msg });
            }
        }
    }

    // ── Arm / capture ─────────────────────────────────────────

    /// Begin the wake-and-prepare sequence.  Idempotent while a session is
    /// active.
    pub fn arm(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        self.ctx.now_ms = now_ms;
        if self.fsm.current_state().is_session_active() {
            debug!("ARM: already armed ({})", self.fsm.state_name());
            return Ok(CommandAck::AlreadyArmed);
        }
        if !self.reliability.should_attempt_wake(now_ms) {
            warn!("ARM: module degraded, not waking");
            return Err(ArmError::ModuleUnavailable.into());
        }
        if let Err(e) = link.wake_line_pulse(now_ms, self.ctx.config.wake_pulse_ms) {
            warn!("ARM: wake pulse failed: {}", e);
            self.ctx.fail(FailureCode::WakeLineFault);
            self.flush(link, sink);
            return Err(ArmError::WakeLineUnavailable.into());
        }
        if let Err(e) = link.write_message(now_ms, &Command::Wake) {
            // The pulse is what wakes the module; the op is a courtesy.
            warn!("ARM: wake op not written: {}", e);
        }

        self.ctx.begin_session(now_ms);
        self.ctx.session.retries = 1;
        self.ctx.session.wake_sent_at = Some(now_ms);
        self.ctx.emit(LinkEvent::Armed);
        self.ctx.emit(LinkEvent::WakePulseSent { attempt: 1 });
        self.drive(StateId::WaitingForBoot);
        self.flush(link, sink);
        info!("ARM: armed");
        Ok(CommandAck::Armed)
    }

    /// Ask the module for stills and video.
    ///
    /// Rejected without any state change while a snapshot is pending, a
    /// sleep is in flight, or an earlier capture is still outstanding.
    pub fn request_capture(
        &mut self,
        request: CaptureRequest,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        self.ctx.now_ms = now_ms;
        self.check_capture_allowed(now_ms)?;

        match self.fsm.current_state() {
            StateId::Ready | StateId::Capturing | StateId::Disarming => {
                if self.ctx.session.capture_queued {
                    warn!("ARM: superseding abandoned capture");
                }
                self.write_capture(request, now_ms, link, sink)
            }
            StateId::Waking if self.ctx.session.prewake.is_some() => {
                if let Some(pw) = self.ctx.session.prewake.as_mut() {
                    pw.request = request;
                }
                Ok(CommandAck::CaptureQueued)
            }
            state if state.is_arming() => {
                info!("ARM: capture '{}' queued until ready", request.trigger);
                self.ctx.session.pending = Some(request);
                Ok(CommandAck::CaptureQueued)
            }
            _ => {
                if self.ctx.status.is_active() && self.ctx.status.settled {
                    self.ctx.begin_session(now_ms);
                    return self.write_capture(request, now_ms, link, sink);
                }
                self.prewake(request, now_ms, link, sink)
            }
        }
    }

    fn check_capture_allowed(&self, now_ms: u64) -> core::result::Result<(), CaptureError> {
        let open_op = self.immediate.map(|s| s.op);
        if open_op == Some(ImmediateOp::Snapshot) {
            return Err(CaptureError::SnapshotPending);
        }
        if self.ctx.session.sleep_in_flight || open_op == Some(ImmediateOp::Sleep) {
            return Err(CaptureError::SleepInFlight);
        }
        if self
            .ctx
            .session
            .capture_outstanding(now_ms, self.ctx.config.capture_timeout_ms)
        {
            return Err(CaptureError::CaptureOutstanding);
        }
        Ok(())
    }

    fn write_capture(
        &mut self,
        request: CaptureRequest,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        let cmd = Command::Capture(request);
        if let Err(e) = link.write_message(now_ms, &cmd) {
            warn!("ARM: capture write failed: {}", e);
            self.ctx.fail(FailureCode::WriteFailed);
            self.flush(link, sink);
            return Err(CaptureError::WriteFailed.into());
        }
        if let Command::Capture(request) = &cmd {
            self.ctx.note_capture_issued(request);
        }
        self.drive(StateId::Capturing);
        self.flush(link, sink);
        Ok(CommandAck::CaptureIssued)
    }

    /// Module asleep: pulse it awake and let `Waking` carry the capture.
    fn prewake(
        &mut self,
        request: CaptureRequest,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        if !self.reliability.should_attempt_wake(now_ms) {
            warn!("ARM: module degraded, capture '{}' refused", request.trigger);
            return Err(ArmError::ModuleUnavailable.into());
        }
        if let Err(e) = link.wake_line_pulse(now_ms, self.ctx.config.wake_pulse_ms) {
            warn!("ARM: pre-wake pulse failed: {}", e);
            self.ctx.fail(FailureCode::WakeLineFault);
            self.flush(link, sink);
            return Err(ArmError::WakeLineUnavailable.into());
        }
        for cmd in [Command::Wake, Command::Status] {
            if let Err(e) = link.write_message(now_ms, &cmd) {
                warn!("ARM: pre-wake '{}' not written: {}", cmd.op(), e);
            }
        }

        info!("ARM: capture '{}' waits for pre-wake", request.trigger);
        self.ctx.begin_session(now_ms);
        self.ctx.session.retries = 1;
        self.ctx.session.wake_sent_at = Some(now_ms);
        self.ctx.session.prewake = Some(PreWake {
            request,
            phase: PreWakePhase::AwaitActive,
            deadline: now_ms + u64::from(self.ctx.config.prewake_active_timeout_ms),
            polled_at: now_ms,
        });
        self.ctx.emit(LinkEvent::WakePulseSent { attempt: 1 });
        self.drive(StateId::Waking);
        self.flush(link, sink);
        Ok(CommandAck::CaptureAfterWake)
    }

    // ── Immediate commands ────────────────────────────────────

    /// Wake the module outside an arm session.
    pub fn wake(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        self.ctx.now_ms = now_ms;
        self.ensure_no_immediate(ImmediateOp::Wake)?;
        if self.fsm.current_state().is_session_active() {
            return Ok(CommandAck::JoinedSession);
        }
        if let Err(e) = link.wake_line_pulse(now_ms, self.ctx.config.wake_pulse_ms) {
            warn!("ARM: wake pulse failed: {}", e);
            self.ctx.fail(FailureCode::WakeLineFault);
            self.flush(link, sink);
            return Err(CommandError::WakeLineUnavailable.into());
        }
        self.open_immediate(ImmediateOp::Wake, &Command::Wake, now_ms, link, sink)
    }

    /// Put the module to sleep.  An active session is steered into
    /// `Disarming` instead of racing it with a second sleep.
    pub fn sleep_now(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        self.ctx.now_ms = now_ms;
        self.ensure_no_immediate(ImmediateOp::Sleep)?;
        if self.fsm.current_state().is_session_active() {
            if let Some(pw) = self.ctx.session.prewake.take() {
                self.ctx.emit(LinkEvent::CaptureFailed {
                    trigger: pw.request.trigger,
                    error: CaptureError::Disarming,
                });
            }
            if let Some(pending) = self.ctx.session.pending.take() {
                self.ctx.emit(LinkEvent::CaptureFailed {
                    trigger: pending.trigger,
                    error: CaptureError::Disarming,
                });
            }
            self.drive(StateId::Disarming);
            self.flush(link, sink);
            return Ok(CommandAck::JoinedSession);
        }
        self.open_immediate(ImmediateOp::Sleep, &Command::Sleep, now_ms, link, sink)
    }

    /// Ask for a status report.
    pub fn status(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        self.ctx.now_ms = now_ms;
        self.ensure_no_immediate(ImmediateOp::Status)?;
        self.open_immediate(ImmediateOp::Status, &Command::Status, now_ms, link, sink)
    }

    /// Take one still now.  Collect it with [`take_snapshot`](Self::take_snapshot).
    pub fn snapshot_now(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        self.ctx.now_ms = now_ms;
        self.ensure_no_immediate(ImmediateOp::Snapshot)?;
        let cmd = Command::Snapshot {
            trigger: Some("manual".into()),
        };
        self.open_immediate(ImmediateOp::Snapshot, &cmd, now_ms, link, sink)
    }

    /// The latched snapshot result, if one arrived since the last take.
    pub fn take_snapshot(&mut self) -> Option<SnapshotResult> {
        self.snapshot.take()
    }

    fn ensure_no_immediate(&self, op: ImmediateOp) -> core::result::Result<(), CommandError> {
        match self.immediate {
            Some(open) if open.op == ImmediateOp::Snapshot && op == ImmediateOp::Snapshot => {
                Err(CommandError::SnapshotPending)
            }
            Some(open) => {
                debug!("ARM: '{}' refused, '{}' still open", op.name(), open.op.name());
                Err(CommandError::Busy)
            }
            None => Ok(()),
        }
    }

    fn open_immediate(
        &mut self,
        op: ImmediateOp,
        cmd: &Command,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        if let Err(e) = link.write_message(now_ms, cmd) {
            warn!("ARM: '{}' not written: {}", op.name(), e);
            self.ctx.fail(FailureCode::WriteFailed);
            self.flush(link, sink);
            return Err(CommandError::LinkDown.into());
        }
        self.immediate = Some(ImmediateSession::open(op, now_ms, &self.ctx.config));
        debug!("ARM: '{}' open", op.name());
        Ok(CommandAck::Queued)
    }

    fn resolve_immediate(&mut self, now_ms: u64) {
        let Some(open) = self.immediate else {
            return;
        };
        let Some(outcome) = open.resolve(&self.ctx.activity, now_ms) else {
            return;
        };
        self.immediate = None;
        match outcome {
            ImmediateOutcome::Completed => {
                debug!("ARM: '{}' completed", open.op.name());
                self.ctx.succeed();
            }
            ImmediateOutcome::TimedOut => {
                warn!("ARM: '{}' timed out", open.op.name());
                self.ctx.fail(FailureCode::CommandTimeout);
            }
        }
        self.ctx.emit(LinkEvent::ImmediateFinished { op: open.op, outcome });
    }

    // ── Wi-Fi provisioning passthrough ────────────────────────

    fn send_wifi(&mut self, cmd: &Command, now_ms: u64, link: &mut impl LinkPort) -> Result<CommandAck> {
        link.write_message(now_ms, cmd).map_err(|e| {
            warn!("ARM: '{}' not written: {}", cmd.op(), e);
            Error::from(CommandError::LinkDown)
        })?;
        Ok(CommandAck::Queued)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (visit detection, console, MQTT).
    pub fn handle_command(
        &mut self,
        cmd: LinkCommand,
        now_ms: u64,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandAck> {
        match cmd {
            LinkCommand::Arm => self.arm(now_ms, link, sink),
            LinkCommand::Capture(request) => self.request_capture(request, now_ms, link, sink),
            LinkCommand::Wake => self.wake(now_ms, link, sink),
            LinkCommand::Sleep => self.sleep_now(now_ms, link, sink),
            LinkCommand::Status => self.status(now_ms, link, sink),
            LinkCommand::Snapshot => self.snapshot_now(now_ms, link, sink),
            LinkCommand::StageWifi { ssid, psk, token } => {
                self.send_wifi(&Command::StageWifi { ssid, psk, token }, now_ms, link)
            }
            LinkCommand::CommitWifi { token } => {
                self.send_wifi(&Command::CommitWifi { token }, now_ms, link)
            }
            LinkCommand::AbortWifi { token } => {
                self.send_wifi(&Command::AbortWifi { token }, now_ms, link)
            }
            LinkCommand::UpdateConfig(config) => self.update_config(config),
        }
    }

    /// Validate and apply new configuration.  Takes effect on the next
    /// timeout comparison; running sessions are not restarted.
    pub fn update_config(&mut self, config: LinkConfig) -> Result<CommandAck> {
        config.validate()?;
        self.reliability.reconfigure(&config);
        self.ctx.config = config;
        info!("ARM: configuration updated at runtime");
        Ok(CommandAck::ConfigApplied)
    }

    /// Persist the live configuration.
    pub fn save_config(&self, storage: &impl ConfigPort) -> Result<()> {
        storage.save(&self.ctx.config).map_err(|e| {
            warn!("ARM: config save failed: {}", e);
            Error::from(e)
        })
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn module_status(&self) -> &ModuleStatus {
        &self.ctx.status
    }

    pub fn session(&self) -> &ArmSession {
        &self.ctx.session
    }

    pub fn last_completion(&self) -> Option<&CaptureCompletion> {
        self.ctx.last_completion.as_ref()
    }

    pub fn is_likely_present(&self) -> bool {
        self.reliability.is_likely_present()
    }

    pub fn reliability(&self) -> &ReliabilityManager {
        &self.reliability
    }

    pub fn config(&self) -> &LinkConfig {
        &self.ctx.config
    }

    pub fn immediate(&self) -> Option<ImmediateSession> {
        self.immediate
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Milliseconds spent in the current state.
    pub fn ms_in_state(&self) -> u64 {
        self.ctx.ms_in_state()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Forced transition with a `StateChanged` event.
    fn drive(&mut self, next: StateId) {
        if let Some(Transition { from, to }) = self.fsm.force_transition(next, &mut self.ctx) {
            self.ctx.emit(LinkEvent::StateChanged { from, to });
        }
    }

    fn record_success(&mut self, sink: &mut impl EventSink) {
        if self.reliability.record_success() {
            sink.emit(&LinkEvent::Recovered);
        }
    }

    /// Perform queued link actions, then publish events and feed the
    /// reliability manager.
    fn flush(&mut self, link: &mut impl LinkPort, sink: &mut impl EventSink) {
        let now_ms = self.ctx.now_ms;

        for _ in 0..MAX_FLUSH_ROUNDS {
            if self.ctx.actions.is_empty() {
                break;
            }
            let actions = core::mem::take(&mut self.ctx.actions);
            for action in actions {
                self.apply_action(action, now_ms, link);
            }
        }

        for event in core::mem::take(&mut self.ctx.events) {
            sink.emit(&event);
        }

        for code in core::mem::take(&mut self.ctx.failures) {
            if self.reliability.record_failure(code, now_ms) == Escalation::PowerCycle {
                let cfg = &self.ctx.config;
                if let Err(e) = link.power_cycle(now_ms, cfg.power_off_ms, cfg.power_on_delay_ms) {
                    error!("RELIABILITY: power cycle failed: {}", e);
                }
                self.ctx.status.state = "off".into();
                self.ctx.status.settled = false;
                sink.emit(&LinkEvent::Degraded {
                    failures: self.reliability.failure_count(),
                });
            }
        }

        for _ in 0..core::mem::take(&mut self.ctx.successes) {
            self.record_success(sink);
        }
    }

    fn apply_action(&mut self, action: LinkAction, now_ms: u64, link: &mut impl LinkPort) {
        match action {
            LinkAction::WakePulse => {
                if let Err(e) = link.wake_line_pulse(now_ms, self.ctx.config.wake_pulse_ms) {
                    warn!("ARM: wake pulse failed: {}", e);
                    self.ctx.fail(FailureCode::WakeLineFault);
                }
            }
            LinkAction::Send(cmd) => {
                let Err(e) = link.write_message(now_ms, &cmd) else {
                    return;
                };
                warn!("ARM: '{}' not written: {}", cmd.op(), e);
                self.ctx.fail(FailureCode::WriteFailed);
                if let Command::Capture(request) = cmd {
                    self.ctx.session.capture_queued = false;
                    self.ctx.emit(LinkEvent::CaptureFailed {
                        trigger: request.trigger,
                        error: CaptureError::WriteFailed,
                    });
                    self.drive(StateId::Disarming);
                }
            }
        }
    }
}
