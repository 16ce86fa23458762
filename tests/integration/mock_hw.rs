//! Mock hardware for integration tests.
//!
//! Scripted serial channel, recording control-line pins and delay, and a
//! recording event sink.  Shared handles (`Rc<RefCell<..>>`) let the test
//! keep inspecting a mock after it has been moved into the transport.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use feedercam::app::events::LinkEvent;
use feedercam::app::ports::EventSink;
use feedercam::app::service::Orchestrator;
use feedercam::config::LinkConfig;
use feedercam::fsm::StateId;
use feedercam::link::LinkTransport;
use feedercam::link::ring::Direction;
use feedercam::link::transport::SerialPort;

// ── MockSerial ────────────────────────────────────────────────

#[derive(Default)]
struct SerialState {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    fail_writes: bool,
    baud: u32,
}

/// Serial channel fed by the test and drained by the transport.
pub struct MockSerial {
    state: Rc<RefCell<SerialState>>,
}

/// Test-side handle to a [`MockSerial`].
#[derive(Clone)]
pub struct SerialHandle {
    state: Rc<RefCell<SerialState>>,
}

pub fn mock_serial() -> (MockSerial, SerialHandle) {
    let state = Rc::new(RefCell::new(SerialState::default()));
    (
        MockSerial {
            state: Rc::clone(&state),
        },
        SerialHandle { state },
    )
}

impl SerialPort for MockSerial {
    type Error = ();

    fn set_baud(&mut self, baud: u32) -> Result<(), ()> {
        self.state.borrow_mut().baud = baud;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let mut st = self.state.borrow_mut();
        let n = buf.len().min(st.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = st.inbound.pop_front().unwrap_or(0);
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        let mut st = self.state.borrow_mut();
        if st.fail_writes {
            return Err(());
        }
        st.outbound.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

#[allow(dead_code)]
impl SerialHandle {
    /// Queue one line from the module (terminator appended).
    pub fn push_line(&self, line: &str) {
        self.push_bytes(line.as_bytes());
        self.push_bytes(b"\n");
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn baud(&self) -> u32 {
        self.state.borrow().baud
    }

    /// Every line written so far, terminators stripped.
    pub fn written_lines(&self) -> Vec<String> {
        let st = self.state.borrow();
        String::from_utf8_lossy(&st.outbound)
            .split_terminator('\n')
            .map(str::to_owned)
            .collect()
    }

    /// The `op` field of every written line.
    pub fn written_ops(&self) -> Vec<String> {
        self.written_lines()
            .iter()
            .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
            .filter_map(|v| v.get("op").and_then(|o| o.as_str()).map(str::to_owned))
            .collect()
    }

    pub fn clear_written(&self) {
        self.state.borrow_mut().outbound.clear();
    }
}

// ── MockPin ───────────────────────────────────────────────────

/// Output pin that records every level it is driven to.
pub struct MockPin {
    levels: Rc<RefCell<Vec<bool>>>,
}

pub fn mock_pin() -> (MockPin, Rc<RefCell<Vec<bool>>>) {
    let levels = Rc::new(RefCell::new(Vec::new()));
    (
        MockPin {
            levels: Rc::clone(&levels),
        },
        levels,
    )
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

// ── MockDelay ─────────────────────────────────────────────────

/// Delay that returns immediately and sums the requested time.
pub struct MockDelay {
    total_ns: Rc<Cell<u64>>,
}

pub fn mock_delay() -> (MockDelay, Rc<Cell<u64>>) {
    let total = Rc::new(Cell::new(0));
    (
        MockDelay {
            total_ns: Rc::clone(&total),
        },
        total,
    )
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.set(self.total_ns.get() + u64::from(ns));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<LinkEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &LinkEvent) {
        self.events.push(event.clone());
    }
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&LinkEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, pred: impl Fn(&LinkEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }
}

// ── Rig: orchestrator + transport + mocks ─────────────────────

pub type MockLink = LinkTransport<MockSerial, MockPin, MockPin, MockDelay>;

pub struct Rig {
    pub orch: Orchestrator,
    pub link: MockLink,
    pub sink: RecordingSink,
    pub serial: SerialHandle,
    pub wake_levels: Rc<RefCell<Vec<bool>>>,
    pub power_levels: Rc<RefCell<Vec<bool>>>,
    pub delay_ns: Rc<Cell<u64>>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_config(LinkConfig::default())
    }

    pub fn with_config(config: LinkConfig) -> Self {
        Self::build(config, true)
    }

    /// Board with no wake line fitted.
    pub fn without_wake_line() -> Self {
        Self::build(LinkConfig::default(), false)
    }

    fn build(config: LinkConfig, wake_fitted: bool) -> Self {
        let (serial, handle) = mock_serial();
        let (wake, wake_levels) = mock_pin();
        let (power, power_levels) = mock_pin();
        let (delay, delay_ns) = mock_delay();
        let wake = if wake_fitted { Some(wake) } else { None };

        let mut link = LinkTransport::new(serial, wake, Some(power), delay);
        link.begin(config.baud, config.wake_active_high, 0)
            .expect("mock link opens");

        let mut sink = RecordingSink::default();
        let mut orch = Orchestrator::new(config);
        orch.start(0, &mut sink);

        Self {
            orch,
            link,
            sink,
            serial: handle,
            wake_levels,
            power_levels,
            delay_ns,
        }
    }

    pub fn state(&self) -> StateId {
        self.orch.state()
    }

    pub fn tick(&mut self, now_ms: u64) {
        self.orch.tick(now_ms, &mut self.link, &mut self.sink);
    }

    /// Tick every `step` ms over `(from, to]`.
    pub fn run(&mut self, from: u64, to: u64, step: u64) {
        let mut t = from + step;
        while t <= to {
            self.tick(t);
            t += step;
        }
    }

    /// Deliver one module line and tick at `now_ms`.
    pub fn inject(&mut self, now_ms: u64, line: &str) {
        self.serial.push_line(line);
        self.tick(now_ms);
    }

    pub fn arm(&mut self, now_ms: u64) -> feedercam::error::Result<feedercam::app::commands::CommandAck> {
        self.orch.arm(now_ms, &mut self.link, &mut self.sink)
    }

    /// Timestamps of every wake pulse, from the traffic ring.
    pub fn pulse_times(&self) -> Vec<u64> {
        self.link
            .ring()
            .iter()
            .filter(|f| f.direction == Direction::Note && f.text.as_str() == "wake pulse")
            .map(|f| f.ts_ms)
            .collect()
    }

    /// Number of times the power-enable line was dropped.
    pub fn power_cuts(&self) -> usize {
        self.power_levels.borrow().iter().filter(|high| !**high).count()
    }
}

// ── Canned module lines ───────────────────────────────────────

pub const BOOT: &str = r#"{"mini":"boot","ts":1,"fw":"cam-2.1"}"#;
pub const READY_UNSETTLED: &str = r#"{"mini":"ready","ts":2,"camera":true,"stream":true,"settled":false}"#;
pub const READY_SETTLED: &str = r#"{"mini":"ready","ts":2,"camera":true,"stream":true,"settled":true}"#;
pub const STATUS_ACTIVE_SETTLED: &str = r#"{"mini":"status","state":"active","settled":true}"#;
pub const STATUS_ACTIVE_UNSETTLED: &str = r#"{"mini":"status","state":"active","settled":false}"#;
pub const SLEEP_DEEP: &str = r#"{"mini":"sleep_deep","ts":9}"#;
pub const DONE_OK: &str = r#"{"mini":"event","phase":"done","trigger":"pir","ok":true}"#;
