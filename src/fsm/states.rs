//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch.  Handlers only read the context and queue work; the
//! orchestrator performs the link I/O after the tick.
//!
//! ```text
//!  IDLE ──[arm]──▶ WAITING_FOR_BOOT ──[boot]──▶ WAITING_FOR_READY ──[ready]──▶ SETTLING
//!   ▲                 │      ▲                        │                          │
//!   │      [boot t/o] ▼      │                  [ready t/o]         [settled ∧ due | t/o]
//!   │               WAKING ──┘                        │                          ▼
//!   ├──────[retries exhausted]────────────────────────┘                        READY
//!   │                                                                            │
//!   │                                                         [capture]  [idle t/o]
//!   │                                                             ▼              │
//!   └──[sleep_deep]── DISARMING ◀──────[done | capture t/o]── CAPTURING          │
//!                        ▲                                                       │
//!                        └───────────────────────────────────────────────────────┘
//!
//!  IDLE ──[capture, module asleep]──▶ WAKING (pre-wake) ──[active ∧ settled]──▶ CAPTURING
//! ```

use super::context::{ArmContext, ArmSession, LinkAction, PreWakePhase};
use super::{StateId, StateRow};
use crate::app::events::{CompletionReason, LinkEvent};
use crate::error::CaptureError;
use crate::protocol::Command;
use crate::reliability::FailureCode;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateRow; StateId::COUNT] {
    [
        StateRow {
            id: StateId::Idle,
            name: "Idle",
            enter: Some(idle_enter),
            update: idle_update,
        },
        StateRow {
            id: StateId::Waking,
            name: "Waking",
            enter: Some(waking_enter),
            update: waking_update,
        },
        StateRow {
            id: StateId::WaitingForBoot,
            name: "WaitingForBoot",
            enter: Some(waiting_for_boot_enter),
            update: waiting_for_boot_update,
        },
        StateRow {
            id: StateId::WaitingForReady,
            name: "WaitingForReady",
            enter: Some(waiting_for_ready_enter),
            update: waiting_for_ready_update,
        },
        StateRow {
            id: StateId::Settling,
            name: "Settling",
            enter: Some(settling_enter),
            update: settling_update,
        },
        StateRow {
            id: StateId::Ready,
            name: "Ready",
            enter: Some(ready_enter),
            update: ready_update,
        },
        StateRow {
            id: StateId::Capturing,
            name: "Capturing",
            enter: Some(capturing_enter),
            update: capturing_update,
        },
        StateRow {
            id: StateId::Disarming,
            name: "Disarming",
            enter: Some(disarming_enter),
            update: disarming_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared guards
// ═══════════════════════════════════════════════════════════════════════════

/// The module went to sleep without being asked: the session is over.
fn slept_unexpectedly(ctx: &mut ArmContext) -> Option<StateId> {
    if ctx.session.slept_at.is_some() && !ctx.session.sleep_in_flight {
        warn!("ARM: module slept unexpectedly, ending session");
        ctx.complete_metadata_only(CompletionReason::ModuleSlept);
        return Some(StateId::Idle);
    }
    None
}

fn send_sleep(ctx: &mut ArmContext) {
    ctx.session.sleep_attempts = ctx.session.sleep_attempts.saturating_add(1);
    ctx.session.sleep_in_flight = true;
    ctx.session.sleep_sent_at = Some(ctx.now_ms);
    ctx.request(LinkAction::Send(Command::Sleep));
    let attempt = ctx.session.sleep_attempts;
    ctx.emit(LinkEvent::SleepRequested { attempt });
}

fn finish_capture(ctx: &mut ArmContext) {
    let Some(done) = ctx.session.done.clone() else {
        return;
    };
    let label = ctx.session.trigger.clone().unwrap_or(done.trigger);
    if done.ok {
        info!("ARM: capture '{}' done", label);
    } else {
        warn!("ARM: capture '{}' done with failure", label);
    }
    ctx.complete(CompletionReason::Trigger(label), Some(done.ok));
}

fn capture_timed_out(ctx: &ArmContext) -> bool {
    ctx.session
        .capture_sent_at
        .is_some_and(|t| ctx.elapsed(t, ctx.config.capture_timeout_ms))
}

fn abandon_capture(ctx: &mut ArmContext) {
    warn!(
        "ARM: no capture completion within {} ms, abandoning",
        ctx.config.capture_timeout_ms
    );
    ctx.fail(FailureCode::CaptureTimeout);
    ctx.complete(CompletionReason::CaptureTimedOut, None);
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut ArmContext) {
    ctx.session = ArmSession::default();
    info!("IDLE: module link quiescent");
}

fn idle_update(_ctx: &mut ArmContext) -> Option<StateId> {
    // Left only through arm(), a capture request or an operator command.
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAKING: wake pulse retry, or pre-wake ahead of a capture
// ═══════════════════════════════════════════════════════════════════════════

fn waking_enter(ctx: &mut ArmContext) {
    if ctx.session.prewake.is_some() {
        info!("WAKING: pre-wake for capture, waiting for module to report active");
        return;
    }
    ctx.session.retries = ctx.session.retries.saturating_add(1);
    ctx.session.wake_sent_at = Some(ctx.now_ms);
    ctx.request(LinkAction::WakePulse);
    ctx.request(LinkAction::Send(Command::Wake));
    let attempt = ctx.session.retries;
    ctx.emit(LinkEvent::WakePulseSent { attempt });
    info!(
        "WAKING: wake pulse {}/{}",
        attempt, ctx.config.max_wake_attempts
    );
}

fn waking_update(ctx: &mut ArmContext) -> Option<StateId> {
    let Some(mut pw) = ctx.session.prewake.clone() else {
        return Some(StateId::WaitingForBoot);
    };
    let started = ctx.session.started_at;
    let trigger = pw.request.trigger.clone();

    match pw.phase {
        PreWakePhase::AwaitActive => {
            let alive = ctx.activity.last_active_at.is_some_and(|t| t >= started)
                || ctx.session.boot_seen_at.is_some()
                || ctx.session.ready_seen_at.is_some();
            if alive {
                if ctx.status.settled {
                    ctx.issue_capture(pw.request);
                    return Some(StateId::Capturing);
                }
                info!("WAKING: module active, waiting for settle");
                pw.phase = PreWakePhase::AwaitSettled;
                pw.deadline = ctx.now_ms + u64::from(ctx.config.prewake_settle_timeout_ms);
                pw.polled_at = ctx.now_ms;
                ctx.request(LinkAction::Send(Command::Status));
                ctx.session.prewake = Some(pw);
                return None;
            }
            if ctx.now_ms >= pw.deadline {
                warn!("WAKING: module never reported active");
                ctx.fail(FailureCode::WakeTimeout);
                ctx.emit(LinkEvent::CaptureFailed {
                    trigger,
                    error: CaptureError::WakeTimeout,
                });
                return Some(StateId::Idle);
            }
        }
        PreWakePhase::AwaitSettled => {
            if ctx.status.settled {
                ctx.issue_capture(pw.request);
                return Some(StateId::Capturing);
            }
            if ctx.now_ms >= pw.deadline {
                warn!("WAKING: module awake but never settled");
                ctx.fail(FailureCode::SettleTimeout);
                ctx.emit(LinkEvent::CaptureFailed {
                    trigger,
                    error: CaptureError::SettleTimeout,
                });
                ctx.session.prewake = None;
                // Awake: put it back to sleep.
                return Some(StateId::Disarming);
            }
        }
    }

    if ctx.elapsed(pw.polled_at, ctx.config.status_timeout_ms) {
        pw.polled_at = ctx.now_ms;
        ctx.request(LinkAction::Send(Command::Status));
    }
    ctx.session.prewake = Some(pw);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING_FOR_BOOT
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_for_boot_enter(ctx: &mut ArmContext) {
    info!(
        "WAITING_FOR_BOOT: attempt {}, timeout {} ms",
        ctx.session.retries, ctx.config.boot_timeout_ms
    );
}

fn waiting_for_boot_update(ctx: &mut ArmContext) -> Option<StateId> {
    if ctx.session.ready_seen_at.is_some() {
        // Boot notice was missed; ready implies it.
        return Some(StateId::Settling);
    }
    if ctx.session.boot_seen_at.is_some() {
        return Some(StateId::WaitingForReady);
    }

    let sent = ctx.session.wake_sent_at.unwrap_or(ctx.session.started_at);
    if !ctx.elapsed(sent, ctx.config.boot_timeout_ms) {
        return None;
    }
    if ctx.session.retries < ctx.config.max_wake_attempts {
        warn!("WAITING_FOR_BOOT: no boot notice, retrying wake");
        return Some(StateId::Waking);
    }

    warn!(
        "WAITING_FOR_BOOT: no boot after {} wake attempts, giving up",
        ctx.session.retries
    );
    ctx.fail(FailureCode::BootTimeout);
    ctx.complete_metadata_only(CompletionReason::NeverReady);
    Some(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING_FOR_READY
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_for_ready_enter(ctx: &mut ArmContext) {
    info!(
        "WAITING_FOR_READY: boot confirmed, timeout {} ms",
        ctx.config.ready_timeout_ms
    );
}

fn waiting_for_ready_update(ctx: &mut ArmContext) -> Option<StateId> {
    if let Some(next) = slept_unexpectedly(ctx) {
        return Some(next);
    }
    if ctx.session.ready_seen_at.is_some() {
        return Some(StateId::Settling);
    }

    let boot = ctx.session.boot_seen_at.unwrap_or(ctx.state_entered_ms);
    if ctx.elapsed(boot, ctx.config.ready_timeout_ms) {
        warn!("WAITING_FOR_READY: late readiness, recording metadata only");
        ctx.fail(FailureCode::ReadyTimeout);
        ctx.complete_metadata_only(CompletionReason::LateReadiness);
        // Booted but not ready: do not leave it running.
        ctx.request(LinkAction::Send(Command::Sleep));
        ctx.mark_module_unknown();
        return Some(StateId::Idle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SETTLING
// ═══════════════════════════════════════════════════════════════════════════

fn settling_enter(ctx: &mut ArmContext) {
    let ready = ctx.session.ready_seen_at.unwrap_or(ctx.now_ms);
    let due = ready + u64::from(ctx.config.settle_delay_ms);
    ctx.session.settle_due_at = Some(due);
    ctx.request(LinkAction::Send(Command::Status));
    info!("SETTLING: ready at {} ms, settle due at {} ms", ready, due);
}

fn settling_update(ctx: &mut ArmContext) -> Option<StateId> {
    if let Some(next) = slept_unexpectedly(ctx) {
        return Some(next);
    }
    let due = ctx.session.settle_due_at.unwrap_or(ctx.now_ms);
    if ctx.status.settled && ctx.now_ms >= due {
        return Some(StateId::Ready);
    }

    let ready = ctx.session.ready_seen_at.unwrap_or(ctx.state_entered_ms);
    if ctx.elapsed(ready, ctx.config.settle_timeout_ms) {
        warn!("SETTLING: no settle confirmation, continuing metadata only");
        ctx.fail(FailureCode::SettleTimeout);
        ctx.session.metadata_only = true;
        ctx.session.reason_override = Some(CompletionReason::LateReadiness);
        return Some(StateId::Ready);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  READY
// ═══════════════════════════════════════════════════════════════════════════

fn ready_enter(ctx: &mut ArmContext) {
    ctx.session.ready_since = Some(ctx.now_ms);
    if ctx.status.settled && !ctx.session.metadata_only {
        ctx.emit(LinkEvent::Settled);
        ctx.succeed();
    }
    info!(
        "READY: accepting captures, idle sleep in {} ms",
        ctx.config.idle_sleep_ms
    );
}

fn ready_update(ctx: &mut ArmContext) -> Option<StateId> {
    if let Some(next) = slept_unexpectedly(ctx) {
        return Some(next);
    }
    if let Some(request) = ctx.session.pending.take() {
        ctx.issue_capture(request);
        return Some(StateId::Capturing);
    }

    let since = ctx.session.ready_since.unwrap_or(ctx.state_entered_ms);
    if ctx.now_ms.saturating_sub(since) > u64::from(ctx.config.idle_sleep_ms) {
        info!("READY: idle window elapsed, disarming");
        return Some(StateId::Disarming);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CAPTURING
// ═══════════════════════════════════════════════════════════════════════════

fn capturing_enter(ctx: &mut ArmContext) {
    info!(
        "CAPTURING: '{}' outstanding",
        ctx.session.trigger.as_deref().unwrap_or("?")
    );
}

fn capturing_update(ctx: &mut ArmContext) -> Option<StateId> {
    if let Some(next) = slept_unexpectedly(ctx) {
        return Some(next);
    }
    if ctx.session.done.is_some() {
        finish_capture(ctx);
        return Some(StateId::Disarming);
    }
    if capture_timed_out(ctx) {
        abandon_capture(ctx);
        return Some(StateId::Disarming);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISARMING
// ═══════════════════════════════════════════════════════════════════════════

fn disarming_enter(_ctx: &mut ArmContext) {
    info!("DISARMING: returning module to sleep");
}

fn disarming_update(ctx: &mut ArmContext) -> Option<StateId> {
    if ctx.session.slept_at.is_some() {
        if ctx.session.capture_queued {
            ctx.complete_metadata_only(CompletionReason::ModuleSlept);
        }
        info!("DISARMING: sleep confirmed");
        return Some(StateId::Idle);
    }

    if ctx.session.capture_queued {
        if ctx.session.done.is_some() {
            finish_capture(ctx);
        } else if capture_timed_out(ctx) {
            abandon_capture(ctx);
        } else {
            return None;
        }
    }

    if !ctx.session.sleep_in_flight {
        send_sleep(ctx);
        return None;
    }

    let sent = ctx.session.sleep_sent_at.unwrap_or(ctx.state_entered_ms);
    if !ctx.elapsed(sent, ctx.config.sleep_ack_timeout_ms) {
        return None;
    }
    if ctx.session.sleep_attempts < ctx.config.max_sleep_attempts {
        warn!("DISARMING: no sleep_deep, resending sleep");
        send_sleep(ctx);
        return None;
    }
    warn!(
        "DISARMING: sleep unconfirmed after {} attempts, forcing idle",
        ctx.session.sleep_attempts
    );
    ctx.fail(FailureCode::SleepTimeout);
    ctx.mark_module_unknown();
    Some(StateId::Idle)
}
