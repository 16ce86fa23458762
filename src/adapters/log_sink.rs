//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured link events to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future MQTT adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`LinkEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            LinkEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            LinkEvent::Armed => info!("ARM | wake sequence started"),
            LinkEvent::WakePulseSent { attempt } => {
                info!("ARM | wake pulse #{}", attempt);
            }
            LinkEvent::BootConfirmed { firmware } => {
                info!("MODULE | boot fw={}", firmware.as_deref().unwrap_or("?"));
            }
            LinkEvent::ReadyDetected { camera, stream } => {
                info!("MODULE | ready camera={} stream={}", camera, stream);
            }
            LinkEvent::Settled => info!("MODULE | settled"),
            LinkEvent::CaptureRequested { trigger } => {
                info!("CAPTURE | requested trigger={}", trigger);
            }
            LinkEvent::CaptureProgress { phase, index, total } => {
                info!("CAPTURE | {:?} {}/{}", phase, index, total);
            }
            LinkEvent::CaptureDone(done) => {
                info!(
                    "CAPTURE | done reason=\"{}\" media={} ok={:?}",
                    done.reason, done.media_captured, done.ok
                );
            }
            LinkEvent::CaptureFailed { trigger, error } => {
                warn!("CAPTURE | '{}' failed: {}", trigger, error);
            }
            LinkEvent::SleepRequested { attempt } => {
                info!("ARM | sleep request #{}", attempt);
            }
            LinkEvent::SnapshotReady(snap) => {
                info!(
                    "SNAPSHOT | ok={} bytes={} path={}",
                    snap.ok,
                    snap.bytes,
                    snap.path.as_deref().unwrap_or("-")
                );
            }
            LinkEvent::WifiResult(res) => {
                info!("WIFI | {} ok={} {}", res.op, res.ok, res.reason);
            }
            LinkEvent::ModuleError { msg } => warn!("MODULE | error: {}", msg),
            LinkEvent::ImmediateFinished { op, outcome } => {
                info!("CMD | {} {:?}", op.name(), outcome);
            }
            LinkEvent::Degraded { failures } => {
                warn!("FAULT | module degraded after {} failures", failures);
            }
            LinkEvent::Recovered => info!("FAULT | module recovered"),
        }
    }
}
