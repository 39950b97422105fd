//! Dispatcher counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one dispatcher
///
/// Shared via `Arc` so the controlling task can read progress while the
/// dispatcher runs.
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Messages taken from the subscription
    received: AtomicU64,
    /// Messages whose channel had no mapping
    unmapped: AtomicU64,
    /// Successful queue appends
    appends_succeeded: AtomicU64,
    /// Failed queue appends
    appends_failed: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unmapped(&self) -> u64 {
        self.unmapped.load(Ordering::Relaxed)
    }

    pub fn inc_unmapped(&self) {
        self.unmapped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn appends_succeeded(&self) -> u64 {
        self.appends_succeeded.load(Ordering::Relaxed)
    }

    pub fn inc_appends_succeeded(&self) {
        self.appends_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn appends_failed(&self) -> u64 {
        self.appends_failed.load(Ordering::Relaxed)
    }

    pub fn inc_appends_failed(&self) {
        self.appends_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received(),
            unmapped: self.unmapped(),
            appends_succeeded: self.appends_succeeded(),
            appends_failed: self.appends_failed(),
        }
    }
}

/// Snapshot of dispatcher counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub unmapped: u64,
    pub appends_succeeded: u64,
    pub appends_failed: u64,
}

impl MetricsSnapshot {
    /// Total append attempts
    pub fn appends(&self) -> u64 {
        self.appends_succeeded + self.appends_failed
    }
}
