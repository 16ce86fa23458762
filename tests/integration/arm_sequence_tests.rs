//! Arm sequence: wake, boot, ready, settle, idle and disarm.

use super::mock_hw::*;

use feedercam::app::commands::CommandAck;
use feedercam::app::events::{CompletionReason, LinkEvent};
use feedercam::error::{ArmError, Error};
use feedercam::fsm::StateId;
use feedercam::protocol::CaptureRequest;

// ── Happy path: arm → capture → sleep ─────────────────────────

#[test]
fn full_visit_with_deferred_settle() {
    let mut rig = Rig::new();

    assert_eq!(rig.arm(0), Ok(CommandAck::Armed));
    assert_eq!(rig.state(), StateId::WaitingForBoot);
    assert_eq!(rig.serial.written_ops(), ["wake"]);

    rig.inject(100, BOOT);
    assert_eq!(rig.state(), StateId::WaitingForReady);

    rig.inject(300, READY_UNSETTLED);
    assert_eq!(rig.state(), StateId::Settling);

    // Settle confirmed before the settle delay has run out.
    rig.inject(1_200, STATUS_ACTIVE_SETTLED);
    assert_eq!(rig.state(), StateId::Settling);

    rig.tick(1_300);
    assert_eq!(rig.state(), StateId::Ready);
    assert!(rig.sink.contains(|e| *e == LinkEvent::Settled));

    let req = CaptureRequest::new(3, 10, "pir", Some(45.0));
    let ack = rig.orch.request_capture(req, 1_300, &mut rig.link, &mut rig.sink);
    assert_eq!(ack, Ok(CommandAck::CaptureIssued));
    assert_eq!(rig.state(), StateId::Capturing);
    let lines = rig.serial.written_lines();
    assert_eq!(
        lines.last().map(String::as_str),
        Some(r#"{"op":"capture","count":3,"seconds":10,"trigger":"pir","weight_delta":45.0}"#)
    );

    rig.inject(5_000, DONE_OK);
    assert_eq!(rig.state(), StateId::Disarming);
    let done = rig.orch.last_completion().cloned().expect("completion recorded");
    assert_eq!(done.reason, CompletionReason::Trigger("pir".into()));
    assert!(done.media_captured);

    rig.tick(5_010);
    assert_eq!(rig.serial.written_ops().last().map(String::as_str), Some("sleep"));

    rig.inject(5_500, SLEEP_DEEP);
    assert_eq!(rig.state(), StateId::Idle);
    assert!(!rig.orch.reliability().is_degraded());
}

// ── No boot: three pulses then metadata only ──────────────────

#[test]
fn silent_module_gets_three_pulses_then_idle() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();

    rig.run(0, 23_990, 10);
    assert_ne!(rig.state(), StateId::Idle);

    rig.tick(24_000);
    assert_eq!(rig.state(), StateId::Idle);
    assert_eq!(rig.pulse_times(), [0, 8_000, 16_000]);
    assert_eq!(
        rig.sink.count(|e| matches!(e, LinkEvent::WakePulseSent { .. })),
        3
    );

    let done = rig.orch.last_completion().cloned().expect("completion recorded");
    assert_eq!(done.reason, CompletionReason::NeverReady);
    assert_eq!(done.reason.to_string(), "no capture — module never became ready");
    assert!(!done.media_captured);
    assert_eq!(rig.orch.reliability().failure_count(), 1);
}

#[test]
fn wake_line_is_pulsed_active_then_released() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    // begin() parks the line low, then one high/low pulse.
    assert_eq!(*rig.wake_levels.borrow(), [false, true, false]);
    assert_eq!(rig.delay_ns.get(), 80 * 1_000_000);
}

// ── Idempotence and refusal ───────────────────────────────────

#[test]
fn arm_while_armed_changes_nothing() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    rig.inject(100, BOOT);
    let before = rig.orch.session().clone();
    let pulses = rig.pulse_times();

    assert_eq!(rig.arm(200), Ok(CommandAck::AlreadyArmed));
    assert_eq!(rig.orch.session(), &before);
    assert_eq!(rig.pulse_times(), pulses);
    assert_eq!(rig.state(), StateId::WaitingForReady);
}

#[test]
fn arm_without_wake_line_stays_idle() {
    let mut rig = Rig::without_wake_line();
    assert_eq!(
        rig.arm(0),
        Err(Error::Arm(ArmError::WakeLineUnavailable))
    );
    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.serial.written_ops().is_empty());
}

// ── Readiness edge cases ──────────────────────────────────────

#[test]
fn ready_without_boot_goes_straight_to_settling() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    rig.inject(400, READY_SETTLED);
    assert_eq!(rig.state(), StateId::Settling);
    rig.tick(1_400);
    assert_eq!(rig.state(), StateId::Ready);
}

#[test]
fn late_readiness_records_metadata_only_and_sleeps_module() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    rig.inject(100, BOOT);

    rig.tick(8_099);
    assert_eq!(rig.state(), StateId::WaitingForReady);
    rig.tick(8_100);
    assert_eq!(rig.state(), StateId::Idle);

    let done = rig.orch.last_completion().cloned().unwrap();
    assert_eq!(done.reason, CompletionReason::LateReadiness);
    assert!(!done.media_captured);
    assert_eq!(rig.serial.written_ops().last().map(String::as_str), Some("sleep"));
}

#[test]
fn settle_timeout_marks_session_metadata_only() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    rig.inject(100, BOOT);
    rig.inject(300, READY_UNSETTLED);

    rig.tick(1_799);
    assert_eq!(rig.state(), StateId::Settling);
    rig.tick(1_800);
    assert_eq!(rig.state(), StateId::Ready);
    assert!(rig.orch.session().metadata_only);
    assert!(!rig.sink.contains(|e| *e == LinkEvent::Settled));

    // A capture still runs, but is recorded as late readiness.
    let req = CaptureRequest::new(1, 0, "pir", None);
    rig.orch
        .request_capture(req, 1_900, &mut rig.link, &mut rig.sink)
        .unwrap();
    rig.inject(2_500, DONE_OK);
    let done = rig.orch.last_completion().cloned().unwrap();
    assert_eq!(done.reason, CompletionReason::LateReadiness);
    assert!(!done.media_captured);
}

#[test]
fn unexpected_sleep_ends_session() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    rig.inject(100, BOOT);
    rig.inject(300, READY_SETTLED);
    rig.tick(1_300);
    assert_eq!(rig.state(), StateId::Ready);

    rig.inject(2_000, SLEEP_DEEP);
    assert_eq!(rig.state(), StateId::Idle);
    assert_eq!(
        rig.orch.last_completion().map(|c| c.reason.clone()),
        Some(CompletionReason::ModuleSlept)
    );
}

#[test]
fn sleep_notice_before_boot_does_not_end_session() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    // The module was already on its way down when the pulse went out.
    rig.inject(20, SLEEP_DEEP);
    assert_eq!(rig.state(), StateId::WaitingForBoot);

    rig.inject(100, BOOT);
    rig.tick(110);
    assert_eq!(rig.state(), StateId::WaitingForReady);
    assert!(rig.orch.last_completion().is_none());

    rig.inject(300, READY_SETTLED);
    rig.tick(1_300);
    assert_eq!(rig.state(), StateId::Ready);
}

#[test]
fn idle_ready_session_disarms_after_idle_window() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    rig.inject(100, BOOT);
    rig.inject(300, READY_SETTLED);
    rig.tick(1_300);
    assert_eq!(rig.state(), StateId::Ready);

    rig.tick(91_300);
    assert_eq!(rig.state(), StateId::Ready);
    rig.tick(91_301);
    assert_eq!(rig.state(), StateId::Disarming);
    rig.tick(91_311);
    assert!(rig.orch.session().sleep_in_flight);
}

#[test]
fn unconfirmed_sleep_is_resent_then_forced_idle() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    rig.inject(100, BOOT);
    rig.inject(300, READY_SETTLED);
    rig.tick(1_300);
    rig.orch
        .sleep_now(1_400, &mut rig.link, &mut rig.sink)
        .unwrap();
    assert_eq!(rig.state(), StateId::Disarming);

    rig.tick(1_410); // first sleep
    rig.tick(6_410); // ack timeout: resend
    assert_eq!(rig.orch.session().sleep_attempts, 2);
    rig.tick(11_410); // attempts exhausted
    assert_eq!(rig.state(), StateId::Idle);
    let sleeps = rig.serial.written_ops().iter().filter(|op| *op == "sleep").count();
    assert_eq!(sleeps, 2);
    assert_eq!(rig.orch.reliability().failure_count(), 1);
}
