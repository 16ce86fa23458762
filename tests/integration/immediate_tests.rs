//! One-shot operator commands: wake, sleep, status, snapshot, Wi-Fi and
//! configuration.

use super::mock_hw::*;

use feedercam::adapters::nvs::NvsAdapter;
use feedercam::app::commands::{CommandAck, LinkCommand};
use feedercam::app::events::LinkEvent;
use feedercam::app::immediate::{ImmediateOp, ImmediateOutcome};
use feedercam::app::ports::ConfigPort;
use feedercam::config::LinkConfig;
use feedercam::error::{CaptureError, CommandError, Error};
use feedercam::fsm::StateId;
use feedercam::protocol::CaptureRequest;

const SNAPSHOT_OK: &str =
    r#"{"mini":"snapshot","ok":true,"bytes":20480,"path":"/sd/snap.jpg","trigger":"manual"}"#;

fn finished(rig: &Rig, op: ImmediateOp, outcome: ImmediateOutcome) -> bool {
    rig.sink
        .contains(|e| *e == LinkEvent::ImmediateFinished { op, outcome })
}

#[test]
fn status_completes_on_reply() {
    let mut rig = Rig::new();
    assert_eq!(
        rig.orch.status(0, &mut rig.link, &mut rig.sink),
        Ok(CommandAck::Queued)
    );
    assert_eq!(rig.serial.written_ops(), ["status"]);

    rig.inject(120, r#"{"mini":"status","state":"active","settled":true,"rtsp":"rtsp://10.0.0.7/cam"}"#);
    assert!(finished(&rig, ImmediateOp::Status, ImmediateOutcome::Completed));
    assert!(rig.orch.immediate().is_none());
    assert_eq!(
        rig.orch.module_status().stream_url.as_deref(),
        Some("rtsp://10.0.0.7/cam")
    );
    assert!(rig.orch.is_likely_present());
}

#[test]
fn snapshot_result_is_latched_until_taken() {
    let mut rig = Rig::new();
    rig.orch.snapshot_now(0, &mut rig.link, &mut rig.sink).unwrap();
    assert!(rig.serial.written_lines()[0].contains(r#""trigger":"manual""#));

    rig.inject(800, SNAPSHOT_OK);
    assert!(finished(&rig, ImmediateOp::Snapshot, ImmediateOutcome::Completed));

    let snap = rig.orch.take_snapshot().expect("snapshot latched");
    assert!(snap.ok);
    assert_eq!(snap.bytes, 20_480);
    assert_eq!(snap.path.as_deref(), Some("/sd/snap.jpg"));
    assert!(rig.orch.take_snapshot().is_none());
}

#[test]
fn snapshot_without_reply_times_out() {
    let mut rig = Rig::new();
    rig.orch.snapshot_now(0, &mut rig.link, &mut rig.sink).unwrap();
    rig.tick(9_999);
    assert!(rig.orch.immediate().is_some());
    rig.tick(10_000);
    assert!(finished(&rig, ImmediateOp::Snapshot, ImmediateOutcome::TimedOut));
    assert!(rig.orch.immediate().is_none());
    assert_eq!(rig.orch.reliability().failure_count(), 1);
}

#[test]
fn one_immediate_command_at_a_time() {
    let mut rig = Rig::new();
    rig.orch.status(0, &mut rig.link, &mut rig.sink).unwrap();
    assert_eq!(
        rig.orch.wake(10, &mut rig.link, &mut rig.sink),
        Err(Error::Command(CommandError::Busy))
    );
    assert_eq!(rig.serial.written_ops(), ["status"]);
}

#[test]
fn second_snapshot_reports_snapshot_pending() {
    let mut rig = Rig::new();
    rig.orch.snapshot_now(0, &mut rig.link, &mut rig.sink).unwrap();
    assert_eq!(
        rig.orch.snapshot_now(10, &mut rig.link, &mut rig.sink),
        Err(Error::Command(CommandError::SnapshotPending))
    );
}

#[test]
fn wake_pulses_and_completes_on_boot() {
    let mut rig = Rig::new();
    assert_eq!(
        rig.orch.wake(0, &mut rig.link, &mut rig.sink),
        Ok(CommandAck::Queued)
    );
    assert_eq!(rig.pulse_times(), [0]);
    assert_eq!(rig.serial.written_ops(), ["wake"]);

    rig.inject(400, BOOT);
    assert!(finished(&rig, ImmediateOp::Wake, ImmediateOutcome::Completed));
    assert_eq!(rig.state(), StateId::Idle);
    assert_eq!(rig.orch.module_status().firmware.as_deref(), Some("cam-2.1"));
}

#[test]
fn wake_during_session_joins_it() {
    let mut rig = Rig::new();
    rig.arm(0).unwrap();
    assert_eq!(
        rig.orch.wake(50, &mut rig.link, &mut rig.sink),
        Ok(CommandAck::JoinedSession)
    );
    assert_eq!(rig.pulse_times(), [0]);
}

#[test]
fn sleep_when_idle_completes_on_sleep_deep() {
    let mut rig = Rig::new();
    rig.orch.sleep_now(0, &mut rig.link, &mut rig.sink).unwrap();
    assert_eq!(rig.serial.written_ops(), ["sleep"]);

    rig.inject(200, SLEEP_DEEP);
    assert!(finished(&rig, ImmediateOp::Sleep, ImmediateOutcome::Completed));
    assert_eq!(rig.orch.module_status().state, "sleeping");
}

#[test]
fn sleep_during_prewake_drops_the_capture_and_disarms() {
    let mut rig = Rig::new();
    let req = CaptureRequest::new(1, 0, "pir", None);
    rig.orch.request_capture(req, 0, &mut rig.link, &mut rig.sink).unwrap();
    assert_eq!(rig.state(), StateId::Waking);

    assert_eq!(
        rig.orch.sleep_now(100, &mut rig.link, &mut rig.sink),
        Ok(CommandAck::JoinedSession)
    );
    assert_eq!(rig.state(), StateId::Disarming);
    assert!(rig.sink.contains(|e| matches!(
        e,
        LinkEvent::CaptureFailed { error: CaptureError::Disarming, .. }
    )));

    rig.tick(110);
    assert_eq!(rig.serial.written_ops().last().map(String::as_str), Some("sleep"));
    assert!(rig.orch.immediate().is_none());
}

// ── Wi-Fi provisioning passthrough ────────────────────────────

#[test]
fn stage_wifi_is_written_but_psk_is_masked_in_the_ring() {
    let mut rig = Rig::new();
    let cmd = LinkCommand::StageWifi {
        ssid: "backyard".into(),
        psk: "hunter22".into(),
        token: "t-7".into(),
    };
    assert_eq!(
        rig.orch.handle_command(cmd, 0, &mut rig.link, &mut rig.sink),
        Ok(CommandAck::Queued)
    );
    assert_eq!(
        rig.serial.written_lines(),
        [r#"{"op":"stage_wifi","ssid":"backyard","psk":"hunter22","token":"t-7"}"#]
    );

    let mut dump = String::new();
    rig.link.dump_traffic(&mut dump).unwrap();
    assert!(dump.contains(r#""psk":"***""#));
    assert!(!dump.contains("hunter22"));

    rig.inject(
        3_000,
        r#"{"mini":"wifi_result","ok":true,"reason":"staged","op":"stage_wifi","token":"t-7"}"#,
    );
    assert!(rig.sink.contains(|e| matches!(e, LinkEvent::WifiResult(r) if r.ok && r.token == "t-7")));
}

#[test]
fn wifi_write_failure_reports_link_down() {
    let mut rig = Rig::new();
    rig.serial.set_fail_writes(true);
    let cmd = LinkCommand::CommitWifi { token: "t-7".into() };
    assert_eq!(
        rig.orch.handle_command(cmd, 0, &mut rig.link, &mut rig.sink),
        Err(Error::Command(CommandError::LinkDown))
    );
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn runtime_config_update_applies_and_persists() {
    let mut rig = Rig::new();
    let cfg = LinkConfig {
        boot_timeout_ms: 5_000,
        ..LinkConfig::default()
    };
    assert_eq!(
        rig.orch
            .handle_command(LinkCommand::UpdateConfig(cfg.clone()), 0, &mut rig.link, &mut rig.sink),
        Ok(CommandAck::ConfigApplied)
    );
    assert_eq!(rig.orch.config().boot_timeout_ms, 5_000);

    let nvs = NvsAdapter::new().unwrap();
    rig.orch.save_config(&nvs).unwrap();
    assert_eq!(nvs.load().unwrap(), cfg);

    // The new boot timeout drives the next session.
    rig.arm(100).unwrap();
    rig.tick(5_099);
    assert_eq!(rig.state(), StateId::WaitingForBoot);
    rig.tick(5_100);
    assert_eq!(rig.state(), StateId::Waking);
}

#[test]
fn invalid_config_is_rejected() {
    let mut rig = Rig::new();
    let cfg = LinkConfig {
        settle_delay_ms: 5_000,
        ..LinkConfig::default()
    };
    let res = rig
        .orch
        .handle_command(LinkCommand::UpdateConfig(cfg), 0, &mut rig.link, &mut rig.sink);
    assert!(matches!(res, Err(Error::Config(_))));
    assert_eq!(rig.orch.config(), &LinkConfig::default());
}
