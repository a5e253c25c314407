//! Counters for the scanning pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Process-wide pipeline counters, updated concurrently by invocations.
#[derive(Debug)]
pub struct ScanStats {
    candidates: AtomicU64,
    hits: AtomicU64,
    oracle_failures: AtomicU64,
    record_failures: AtomicU64,
    invocation_failures: AtomicU64,
    started: Instant,
}

/// Point-in-time copy of [`ScanStats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub candidates: u64,
    pub hits: u64,
    pub oracle_failures: u64,
    pub record_failures: u64,
    pub invocation_failures: u64,
    pub elapsed_secs: f64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self {
            candidates: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            oracle_failures: AtomicU64::new(0),
            record_failures: AtomicU64::new(0),
            invocation_failures: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_candidate(&self) {
        self.candidates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oracle_failure(&self) {
        self.oracle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.record_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invocation_failure(&self) {
        self.invocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            candidates: self.candidates.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            oracle_failures: self.oracle_failures.load(Ordering::Relaxed),
            record_failures: self.record_failures.load(Ordering::Relaxed),
            invocation_failures: self.invocation_failures.load(Ordering::Relaxed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }

    /// Emit the current counters as a single log line.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        let rate = if s.elapsed_secs > 0.0 {
            s.candidates as f64 / s.elapsed_secs
        } else {
            0.0
        };
        info!(
            "Stats: {} candidates ({:.1}/s), {} hits, {} oracle failures, {} record failures, {} invocation failures",
            s.candidates, rate, s.hits, s.oracle_failures, s.record_failures, s.invocation_failures
        );
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}
