//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via tracing; request ID flows through all log lines
//! - Metrics are cheap (atomic increments behind the metrics facade)
//! - No token material is ever logged, only rejection reasons

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
