//! Availability aggregation and automatic job assignment for a trades booking
//! platform.
//!
//! The `scheduling` module is the core of the service: it reconciles the
//! business-wide master calendar, per-worker schedules, and the job ledger into
//! per-date availability answers, and performs best-fit worker assignment when
//! a customer confirms a booking. The remaining modules carry the ambient
//! service concerns (configuration, telemetry, top-level errors).

pub mod config;
pub mod error;
pub mod scheduling;
pub mod telemetry;
