//! Runtime diagnostics for the camera link.
//!
//! A [`LinkDiagnostics`] snapshot is collected on demand from the
//! orchestrator and the transport counters and rendered as a short text
//! block for the console.  The traffic ring is dumped separately with
//! [`LinkTransport::dump_traffic`](crate::link::LinkTransport::dump_traffic).

use core::fmt;

use crate::app::service::Orchestrator;
use crate::fsm::StateId;
use crate::link::LinkStats;
use crate::reliability::FailureCode;

/// Point-in-time view of the link and the arm session.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDiagnostics {
    pub uptime_ms: u64,
    pub ticks: u64,
    pub state: StateId,
    pub ms_in_state: u64,
    pub module_state: String,
    pub module_settled: bool,
    pub stream_url: Option<String>,
    pub likely_present: bool,
    pub degraded: bool,
    pub failure_count: u8,
    pub last_failure: Option<FailureCode>,
    pub last_completion: Option<String>,
    pub link: LinkStats,
    /// Free heap in bytes; `None` on host builds.
    pub heap_free: Option<u32>,
}

impl LinkDiagnostics {
    pub fn collect(orch: &Orchestrator, link: LinkStats, uptime_ms: u64) -> Self {
        let status = orch.module_status();
        let reliability = orch.reliability();
        Self {
            uptime_ms,
            ticks: orch.tick_count(),
            state: orch.state(),
            ms_in_state: orch.ms_in_state(),
            module_state: status.state.clone(),
            module_settled: status.settled,
            stream_url: status.stream_url.clone(),
            likely_present: orch.is_likely_present(),
            degraded: reliability.is_degraded(),
            failure_count: reliability.failure_count(),
            last_failure: reliability.last_failure(),
            last_completion: orch.last_completion().map(|c| c.reason.to_string()),
            link,
            heap_free: heap_free(),
        }
    }

    pub fn render(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out, "uptime   {} ms ({} ticks)", self.uptime_ms, self.ticks)?;
        writeln!(out, "state    {:?} for {} ms", self.state, self.ms_in_state)?;
        writeln!(
            out,
            "module   '{}' settled={} present={}",
            self.module_state, self.module_settled, self.likely_present
        )?;
        if let Some(url) = &self.stream_url {
            writeln!(out, "stream   {}", url)?;
        }
        writeln!(
            out,
            "faults   {} in window, degraded={}, last={:?}",
            self.failure_count, self.degraded, self.last_failure
        )?;
        if let Some(reason) = &self.last_completion {
            writeln!(out, "capture  {}", reason)?;
        }
        let l = &self.link;
        writeln!(
            out,
            "link     in={} out={} discarded={} dropped={} write_fail={}",
            l.lines_in, l.lines_out, l.discarded, l.dropped, l.write_failures
        )?;
        if let Some(heap) = self.heap_free {
            writeln!(out, "heap     {} B free", heap)?;
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn heap_free() -> Option<u32> {
    Some(unsafe { esp_idf_svc::sys::esp_get_free_heap_size() })
}

#[cfg(not(target_os = "espidf"))]
fn heap_free() -> Option<u32> {
    None
}
