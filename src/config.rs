//! Link and orchestration configuration parameters
//!
//! Every timeout, retry limit and reliability threshold used by the
//! companion-module core.  Values can be overridden via NVS (see
//! [`ConfigPort`](crate::app::ports::ConfigPort)) or pushed at runtime.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    // --- Serial / control lines ---
    /// UART baud rate towards the companion module
    pub baud: u32,
    /// Width of the wake pulse (ms)
    pub wake_pulse_ms: u32,
    /// Wake line polarity: true = drive HIGH to wake
    pub wake_active_high: bool,
    /// Power-enable held low this long during a power-cycle (ms)
    pub power_off_ms: u32,
    /// Settle time after power is restored (ms)
    pub power_on_delay_ms: u32,

    // --- Arm lifecycle ---
    /// Wait for a `boot` notice after each wake pulse (ms)
    pub boot_timeout_ms: u32,
    /// Wake pulses sent before giving up on boot
    pub max_wake_attempts: u8,
    /// Wait for a `ready` notice after boot (ms)
    pub ready_timeout_ms: u32,
    /// Minimum time after `ready` before the module counts as settled (ms)
    pub settle_delay_ms: u32,
    /// Wait for settle confirmation after `ready` (ms)
    pub settle_timeout_ms: u32,
    /// Ready with nothing to do for this long → disarm (ms)
    pub idle_sleep_ms: u32,

    // --- Capture ---
    /// Outstanding capture is abandoned after this long (ms)
    pub capture_timeout_ms: u32,
    /// Pre-wake: wait for status `active` (ms)
    pub prewake_active_timeout_ms: u32,
    /// Pre-wake: wait for `settled` once active (ms)
    pub prewake_settle_timeout_ms: u32,

    // --- Immediate operations ---
    /// Wait for a status reply (ms)
    pub status_timeout_ms: u32,
    /// Wait for a snapshot result (ms)
    pub snapshot_timeout_ms: u32,
    /// Wait for `sleep_deep` after a sleep command (ms)
    pub sleep_ack_timeout_ms: u32,
    /// Sleep commands sent before forcing the session idle
    pub max_sleep_attempts: u8,

    // --- Reliability ---
    /// Failures within the window that force a power-cycle
    pub error_threshold: u8,
    /// Sliding failure window (ms)
    pub error_window_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // Serial / control lines
            baud: 115_200,
            wake_pulse_ms: 80,
            wake_active_high: true,
            power_off_ms: 500,
            power_on_delay_ms: 200,

            // Arm lifecycle
            boot_timeout_ms: 8_000,
            max_wake_attempts: 3,
            ready_timeout_ms: 8_000,
            settle_delay_ms: 1_000,
            settle_timeout_ms: 1_500,
            idle_sleep_ms: 90_000,

            // Capture
            capture_timeout_ms: 15_000,
            prewake_active_timeout_ms: 15_000,
            prewake_settle_timeout_ms: 1_500,

            // Immediate operations
            status_timeout_ms: 3_000,
            snapshot_timeout_ms: 10_000,
            sleep_ack_timeout_ms: 5_000,
            max_sleep_attempts: 2,

            // Reliability
            error_threshold: 5,
            error_window_ms: 60 * 60 * 1_000, // 1 h
        }
    }
}

impl LinkConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(9_600..=2_000_000).contains(&self.baud) {
            return Err(ConfigError::ValidationFailed("baud must be 9600–2000000"));
        }
        if !(1..=2_000).contains(&self.wake_pulse_ms) {
            return Err(ConfigError::ValidationFailed("wake_pulse_ms must be 1–2000"));
        }
        if self.max_wake_attempts == 0 {
            return Err(ConfigError::ValidationFailed("max_wake_attempts must be ≥ 1"));
        }
        if self.max_sleep_attempts == 0 {
            return Err(ConfigError::ValidationFailed("max_sleep_attempts must be ≥ 1"));
        }
        if self.boot_timeout_ms == 0 || self.ready_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("boot/ready timeouts must be > 0"));
        }
        if self.settle_delay_ms > self.settle_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "settle_delay_ms must not exceed settle_timeout_ms",
            ));
        }
        if self.capture_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("capture_timeout_ms must be > 0"));
        }
        if self.error_threshold == 0 {
            return Err(ConfigError::ValidationFailed("error_threshold must be ≥ 1"));
        }
        if self.error_window_ms < 1_000 {
            return Err(ConfigError::ValidationFailed("error_window_ms must be ≥ 1000"));
        }
        if self.idle_sleep_ms < self.settle_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "idle_sleep_ms must be ≥ settle_timeout_ms",
            ));
        }
        Ok(())
    }
}
