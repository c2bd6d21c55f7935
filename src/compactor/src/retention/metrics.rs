//! Size-Based Retention Metrics
//!
//! Thread-safe counters for monitoring the size-based retention trigger.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Thread-safe metrics for tracking retention trigger ticks
#[derive(Debug, Clone)]
pub struct RetentionMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Number of ticks evaluated
    ticks_evaluated: AtomicUsize,
    /// Ticks that found usage below the threshold
    ticks_skipped: AtomicUsize,
    /// Compaction callback invocations
    compactions_triggered: AtomicUsize,
    /// Compaction callback failures
    compactions_failed: AtomicUsize,
    /// Disk usage probe failures
    probe_failures: AtomicUsize,
    /// Last observed usage percentage, stored as f64 bits
    last_used_percent: AtomicU64,
}

impl Default for RetentionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RetentionMetrics {
    /// Create a new metrics tracker
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                ticks_evaluated: AtomicUsize::new(0),
                ticks_skipped: AtomicUsize::new(0),
                compactions_triggered: AtomicUsize::new(0),
                compactions_failed: AtomicUsize::new(0),
                probe_failures: AtomicUsize::new(0),
                last_used_percent: AtomicU64::new(0f64.to_bits()),
            }),
        }
    }

    pub fn record_tick(&self) {
        self.inner.ticks_evaluated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.inner.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compaction_triggered(&self) {
        self.inner
            .compactions_triggered
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compaction_failed(&self) {
        self.inner
            .compactions_failed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_failure(&self) {
        self.inner.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_used_percent(&self, used_percent: f64) {
        self.inner
            .last_used_percent
            .store(used_percent.to_bits(), Ordering::Relaxed);
    }

    pub fn ticks_evaluated(&self) -> usize {
        self.inner.ticks_evaluated.load(Ordering::Relaxed)
    }

    pub fn ticks_skipped(&self) -> usize {
        self.inner.ticks_skipped.load(Ordering::Relaxed)
    }

    pub fn compactions_triggered(&self) -> usize {
        self.inner.compactions_triggered.load(Ordering::Relaxed)
    }

    pub fn compactions_failed(&self) -> usize {
        self.inner.compactions_failed.load(Ordering::Relaxed)
    }

    pub fn probe_failures(&self) -> usize {
        self.inner.probe_failures.load(Ordering::Relaxed)
    }

    /// Usage percentage seen by the most recent successful probe
    pub fn last_used_percent(&self) -> f64 {
        f64::from_bits(self.inner.last_used_percent.load(Ordering::Relaxed))
    }
}
