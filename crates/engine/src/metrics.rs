//! Engine observability hooks
//!
//! Counters the external metrics collaborator polls: build outcomes and
//! durations. Snapshot age and the neighbor-count distribution live on
//! `ModelCache` and `SimilarityIndex` respectively.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Atomic build counters, shared between the scheduler and readers
#[derive(Debug, Default)]
pub struct EngineMetrics {
    builds_succeeded: AtomicU64,
    builds_failed: AtomicU64,
    last_build_duration_ms: AtomicU64,
    last_build_skipped_records: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, duration: Duration, skipped_records: u64) {
        self.builds_succeeded.fetch_add(1, Ordering::Relaxed);
        self.last_build_duration_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
        self.last_build_skipped_records
            .store(skipped_records, Ordering::Relaxed);
    }

    pub fn record_failure(&self, duration: Duration) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
        self.last_build_duration_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            builds_succeeded: self.builds_succeeded.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            last_build_duration: Duration::from_millis(
                self.last_build_duration_ms.load(Ordering::Relaxed),
            ),
            last_build_skipped_records: self.last_build_skipped_records.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time read of the build counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub builds_succeeded: u64,
    pub builds_failed: u64,
    pub last_build_duration: Duration,
    pub last_build_skipped_records: u64,
}
