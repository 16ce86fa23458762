//! Reliability manager.
//!
//! Runs **every tick after the state machine** and folds the tick's
//! failures and successes into a rolling error window.
//!
//! ## Escalation lifecycle
//!
//! 1. A timeout or transport fault is recorded as a [`FailureCode`].
//! 2. Failures inside one window accumulate; a failure after the window
//!    has expired restarts it at count 1.
//! 3. When the count reaches the threshold the manager asks for a
//!    hardware power-cycle **once** and flags the module degraded.
//! 4. The next success clears the count and the degraded flag and the
//!    orchestrator publishes a `Recovered` event.
//!
//! While degraded, wake attempts are refused until the window lapses so a
//! dead module does not cost a full boot-timeout cycle on every visit.

use log::{error, info, warn};

use crate::config::LinkConfig;

/// Named failure sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    BootTimeout,
    ReadyTimeout,
    SettleTimeout,
    WakeTimeout,
    CaptureTimeout,
    SleepTimeout,
    /// An immediate command got no reply in time.
    CommandTimeout,
    WriteFailed,
    WakeLineFault,
}

/// What the caller must do after a failure was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    None,
    PowerCycle,
}

/// Rolling failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorWindow {
    pub window_start_ms: u64,
    pub count: u8,
    pub threshold: u8,
    pub degraded: bool,
}

pub struct ReliabilityManager {
    window: ErrorWindow,
    window_ms: u64,
    /// Any status, boot or ready has ever been observed.
    heard: bool,
    last_failure: Option<FailureCode>,
}

impl ReliabilityManager {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            window: ErrorWindow {
                window_start_ms: 0,
                count: 0,
                threshold: config.error_threshold,
                degraded: false,
            },
            window_ms: u64::from(config.error_window_ms),
            heard: false,
            last_failure: None,
        }
    }

    /// Apply new threshold and window length; current counts are kept.
    pub fn reconfigure(&mut self, config: &LinkConfig) {
        self.window.threshold = config.error_threshold;
        self.window_ms = u64::from(config.error_window_ms);
    }

    fn window_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.window.window_start_ms) > self.window_ms
    }

    pub fn record_failure(&mut self, code: FailureCode, now_ms: u64) -> Escalation {
        self.last_failure = Some(code);
        if self.window.count == 0 || self.window_expired(now_ms) {
            self.window.window_start_ms = now_ms;
            self.window.count = 1;
        } else {
            self.window.count = self.window.count.saturating_add(1);
        }
        warn!(
            "RELIABILITY: failure {:?} ({}/{})",
            code, self.window.count, self.window.threshold
        );

        if self.window.count >= self.window.threshold && !self.window.degraded {
            self.window.degraded = true;
            error!(
                "RELIABILITY: {} failures within window, power-cycling module",
                self.window.count
            );
            return Escalation::PowerCycle;
        }
        Escalation::None
    }

    /// Returns `true` if this success cleared the degraded flag.
    pub fn record_success(&mut self) -> bool {
        self.window.count = 0;
        self.window.window_start_ms = 0;
        if self.window.degraded {
            self.window.degraded = false;
            info!("RELIABILITY: module recovered");
            return true;
        }
        false
    }

    pub fn mark_heard(&mut self) {
        self.heard = true;
    }

    /// False while degraded or if the module has never been heard from.
    pub fn is_likely_present(&self) -> bool {
        !self.window.degraded && self.heard
    }

    /// Wake gate.  A module that was never heard from still gets its
    /// attempts (it may simply be powered late); a degraded module is
    /// skipped until its failure window lapses.
    pub fn should_attempt_wake(&self, now_ms: u64) -> bool {
        !self.window.degraded || self.window_expired(now_ms)
    }

    pub fn is_degraded(&self) -> bool {
        self.window.degraded
    }

    pub fn failure_count(&self) -> u8 {
        self.window.count
    }

    pub fn window(&self) -> ErrorWindow {
        self.window
    }

    pub fn last_failure(&self) -> Option<FailureCode> {
        self.last_failure
    }
}
