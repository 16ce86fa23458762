//! Feeder camera-link firmware library.
//!
//! The controller side of the companion camera module: serial transport,
//! JSON-line protocol, arm/capture orchestration and reliability.  Exposes
//! the pure-logic modules for integration testing; ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod link;
pub mod pins;
pub mod protocol;
pub mod reliability;

pub mod adapters;
