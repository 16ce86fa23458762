//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                 |
//! |------------|--------------|-----------------------------|
//! | `log_sink` | EventSink    | Serial log output           |
//! | `nvs`      | ConfigPort   | NVS / in-memory store       |
//! | `time`     | (none)       | ESP32 system timer          |
//! | `uart`     | SerialPort   | ESP-IDF UART driver         |
//!
//! The serial link itself (`LinkPort`) lives in [`crate::link`] because it
//! is generic over `SerialPort` and the embedded-hal pin traits.

pub mod log_sink;
pub mod nvs;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
