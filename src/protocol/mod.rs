//! Companion-module wire protocol.
//!
//! Newline-terminated JSON objects, one per line, UTF-8.
//!
//! ```text
//!  main controller                               camera module
//!  ───────────────                               ─────────────
//!   {"op":"wake"}                        ──▶
//!                                        ◀──   {"mini":"boot","ts":812,"fw":"2.1.0"}
//!                                        ◀──   {"mini":"ready","ts":1604,"camera":true}
//!   {"op":"status"}                      ──▶
//!                                        ◀──   {"mini":"status","state":"active","settled":true}
//!   {"op":"capture","count":3,...}       ──▶
//!                                        ◀──   {"mini":"event","phase":"done","ok":true}
//!   {"op":"sleep"}                       ──▶
//!                                        ◀──   {"mini":"sleep_deep","ts":9120}
//! ```
//!
//! Outbound messages ([`Command`]) are tagged by `op`; inbound messages
//! ([`InboundMessage`]) by `mini`.  The [`dispatcher`] turns raw lines into
//! typed messages and never lets a decode failure escape.

pub mod commands;
pub mod dispatcher;
pub mod messages;

pub use commands::{CaptureRequest, Command};
pub use dispatcher::{DecodeError, Dispatcher};
pub use messages::{
    BootNotice, CaptureEvent, CapturePhase, InboundMessage, ModuleFault, ReadyNotice,
    SleepNotice, SnapshotResult, StatusReport, WifiResult,
};
