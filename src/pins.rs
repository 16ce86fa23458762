//! GPIO / peripheral pin assignments for the feeder main board.
//!
//! Single source of truth: the link bring-up references this module rather
//! than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Companion camera module (UART1)
// ---------------------------------------------------------------------------

/// UART peripheral dedicated to the camera module.
pub const MINI_UART_NUM: u8 = 1;
/// Controller RX ← module TX.
pub const MINI_UART_RX_GPIO: i32 = 12;
/// Controller TX → module RX.
pub const MINI_UART_TX_GPIO: i32 = 13;

/// Wake line into the module's deep-sleep wake pin.
pub const MINI_WAKE_GPIO: i32 = 14;

/// Load switch on the module's supply.  `-1` = not fitted; power-cycling is
/// then unavailable and the reliability manager only logs.
pub const MINI_POWER_EN_GPIO: i32 = -1;

/// Returns the GPIO number, or `None` for the `-1` "not fitted" marker.
pub const fn fitted(gpio: i32) -> Option<i32> {
    if gpio < 0 { None } else { Some(gpio) }
}
