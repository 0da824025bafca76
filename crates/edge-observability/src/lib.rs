//! Observability for edge invalidation.
//!
//! This crate provides:
//! - `init_logging` - Global `tracing` subscriber (human or JSON output)
//! - `InvalidationMetrics` - Counters for ban dispatches and server failures

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export logging config from edge-core for convenience
pub use edge_core::{LogFormat, LoggingConfig};
