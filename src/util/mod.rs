//! Process-level helpers for the server binary.
//!
//! - [`sig_down`] - Graceful shutdown signal handling
//! - [`telemetry`] - Logging and optional OpenTelemetry export

pub mod sig_down;
pub mod telemetry;

pub use sig_down::*;
pub use telemetry::*;
