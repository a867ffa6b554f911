//! Decision events, tick tracing and run counters for Volition.
//!
//! Every tick produces exactly one [`DecisionEvent`], written to a
//! [`DecisionSink`]. The [`TelemetryEngine`] keeps per-tick traces of the
//! pipeline stages (proposal, execution, judgment, satisfaction) and running
//! counters for the `status` view.

pub mod engine;
pub mod model;
pub mod sink;

pub use engine::TelemetryEngine;
pub use model::{DecisionEvent, RunSummary, ScoredCandidate, Span, SpanKind, Trace};
pub use sink::{DecisionSink, JsonlDecisionSink, MemoryDecisionSink};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("event log I/O failed at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("unknown trace id: {0}")]
    UnknownTrace(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
