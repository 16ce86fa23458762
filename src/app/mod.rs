//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the feeder's camera link:
//! arm/capture orchestration, one-shot operator commands, and the events
//! the core publishes.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without a real module attached.

pub mod commands;
pub mod events;
pub mod immediate;
pub mod ports;
pub mod service;
