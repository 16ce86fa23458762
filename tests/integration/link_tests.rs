//! Transport robustness: framing, malformed input, traffic ring.

use super::mock_hw::*;

use feedercam::app::ports::LinkPort;
use feedercam::error::LinkError;
use feedercam::fsm::StateId;
use feedercam::link::codec::RX_BUF_SIZE;
use feedercam::protocol::{Command, InboundMessage};

#[test]
fn begin_sets_baud_powers_module_and_notes_open() {
    let rig = Rig::new();
    assert!(rig.link.is_open());
    assert_eq!(rig.serial.baud(), 115_200);
    assert_eq!(*rig.power_levels.borrow(), [true]);

    let mut dump = String::new();
    rig.link.dump_traffic(&mut dump).unwrap();
    assert_eq!(dump, "[0] = open\n");
}

#[test]
fn garbage_lines_are_dropped_and_state_is_untouched() {
    let mut rig = Rig::new();
    rig.serial.push_line("not json at all");
    rig.serial.push_line(r#"{"state":"active"}"#);
    rig.serial.push_line(r#"{"mini":"teleport"}"#);
    rig.serial.push_line(r#"{"mini":"status","settled":"yes"}"#);
    rig.tick(10);

    let stats = rig.link.stats();
    assert_eq!(stats.lines_in, 4);
    assert_eq!(stats.dropped, 4);
    assert_eq!(rig.state(), StateId::Idle);
    assert_eq!(rig.orch.module_status().state, "");
    assert!(!rig.orch.is_likely_present());
}

#[test]
fn overlong_line_is_discarded_and_next_line_survives() {
    let mut rig = Rig::new();
    let long = "x".repeat(RX_BUF_SIZE * 2);
    rig.serial.push_line(&long);
    rig.serial.push_line(STATUS_ACTIVE_SETTLED);
    rig.tick(10);

    let stats = rig.link.stats();
    assert_eq!(stats.discarded, 1);
    assert_eq!(stats.lines_in, 1);
    assert!(rig.orch.module_status().is_active());
    assert!(rig.orch.module_status().settled);
}

#[test]
fn crlf_and_blank_lines_are_tolerated() {
    let mut rig = Rig::new();
    rig.serial.push_bytes(b"\r\n\r\n");
    rig.serial.push_bytes(STATUS_ACTIVE_SETTLED.as_bytes());
    rig.serial.push_bytes(b"\r\n");
    rig.tick(10);
    assert_eq!(rig.link.stats().lines_in, 1);
    assert!(rig.orch.module_status().is_active());
}

#[test]
fn line_split_across_pumps_is_reassembled() {
    let mut rig = Rig::new();
    let (head, tail) = STATUS_ACTIVE_SETTLED.split_at(10);
    rig.serial.push_bytes(head.as_bytes());
    rig.tick(10);
    assert_eq!(rig.link.stats().lines_in, 0);

    rig.serial.push_bytes(tail.as_bytes());
    rig.serial.push_bytes(b"\n");
    rig.tick(20);
    assert_eq!(rig.link.stats().lines_in, 1);
    assert!(rig.orch.module_status().settled);
}

#[test]
fn burst_of_lines_delivered_in_order() {
    let (serial, handle) = mock_serial();
    let (delay, _) = mock_delay();
    let mut link: MockLink = feedercam::link::LinkTransport::new(serial, None, None, delay);
    link.begin(115_200, true, 0).unwrap();

    for i in 0..20 {
        handle.push_line(&format!(r#"{{"mini":"error","msg":"m{}"}}"#, i));
    }
    let mut seen = Vec::new();
    let mut total = 0;
    // The pump bounds its reads; keep pumping until drained.
    for _ in 0..10 {
        total += link.pump_once(0, &mut |m| seen.push(m));
    }
    assert_eq!(total, 20);
    for (i, msg) in seen.iter().enumerate() {
        match msg {
            InboundMessage::Error(fault) => assert_eq!(fault.msg, format!("m{}", i)),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn closed_link_refuses_writes() {
    let (serial, _handle) = mock_serial();
    let (delay, _) = mock_delay();
    let mut link: MockLink = feedercam::link::LinkTransport::new(serial, None, None, delay);
    assert_eq!(link.write_message(0, &Command::Status), Err(LinkError::NotOpen));

    link.begin(115_200, true, 0).unwrap();
    assert!(link.write_message(0, &Command::Status).is_ok());
    link.close(5);
    assert_eq!(link.write_message(10, &Command::Status), Err(LinkError::NotOpen));
}

#[test]
fn missing_control_lines_report_named_errors() {
    let (serial, _handle) = mock_serial();
    let (delay, _) = mock_delay();
    let mut link: MockLink = feedercam::link::LinkTransport::new(serial, None, None, delay);
    link.begin(115_200, true, 0).unwrap();
    assert_eq!(link.wake_line_pulse(0, 80), Err(LinkError::NoWakeLine));
    assert_eq!(link.power_cycle(0, 500, 200), Err(LinkError::NoPowerLine));
}

#[test]
fn power_cycle_drops_partial_input() {
    let mut rig = Rig::new();
    rig.serial.push_bytes(br#"{"mini":"status","sta"#);
    rig.tick(10);
    rig.link.power_cycle(20, 500, 200).unwrap();
    assert_eq!(*rig.power_levels.borrow(), [true, false, true]);

    rig.serial.push_line(STATUS_ACTIVE_SETTLED);
    rig.tick(30);
    assert_eq!(rig.link.stats().dropped, 0);
    assert!(rig.orch.module_status().settled);
}

#[test]
fn module_error_is_surfaced() {
    let mut rig = Rig::new();
    rig.inject(10, r#"{"mini":"error","msg":"sd card missing"}"#);
    assert!(rig.sink.contains(|e| matches!(
        e,
        feedercam::app::events::LinkEvent::ModuleError { msg } if msg == "sd card missing"
    )));
}
