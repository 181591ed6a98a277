//! Observability
//!
//! Logging setup and the end-of-run summary printed by `sortie run`.

pub mod logging;
pub mod summary;

pub use logging::{LogFormat, init_logging};
pub use summary::{PhaseOutcome, RunSummary, StopReason, TimelineEntry};
