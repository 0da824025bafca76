//! Invalidation counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide counters for ban dispatches.
///
/// Shared through an `Arc` by every dispatcher; all updates are relaxed
/// increments, so a snapshot is only approximately consistent.
#[derive(Debug, Default)]
pub struct InvalidationMetrics {
    patterns_dispatched: AtomicU64,
    server_attempts: AtomicU64,
    server_failures: AtomicU64,
    empty_dispatches: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Ban patterns handed to the dispatcher.
    pub patterns_dispatched: u64,
    /// Individual server requests attempted.
    pub server_attempts: u64,
    /// Server requests that failed.
    pub server_failures: u64,
    /// Dispatches that found no live server.
    pub empty_dispatches: u64,
}

impl MetricsSnapshot {
    /// Server requests that succeeded.
    pub fn server_successes(&self) -> u64 {
        self.server_attempts.saturating_sub(self.server_failures)
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl InvalidationMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one dispatched pattern fanned out to `servers` servers.
    pub fn record_dispatch(&self, servers: usize) {
        self.patterns_dispatched.fetch_add(1, Ordering::Relaxed);
        if servers == 0 {
            self.empty_dispatches.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the outcome of one server request.
    pub fn record_attempt(&self, success: bool) {
        self.server_attempts.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.server_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            patterns_dispatched: self.patterns_dispatched.load(Ordering::Relaxed),
            server_attempts: self.server_attempts.load(Ordering::Relaxed),
            server_failures: self.server_failures.load(Ordering::Relaxed),
            empty_dispatches: self.empty_dispatches.load(Ordering::Relaxed),
        }
    }
}
