use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    requests: AtomicU64,
    summaries_completed: AtomicU64,
    failures: AtomicU64,
    chunks_summarized: AtomicU64,
    chunks_dropped: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an incoming summarization request.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished summary and the chunk counts it consumed and discarded.
    pub fn record_summary(&self, chunks_summarized: u64, chunks_dropped: u64) {
        self.summaries_completed.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunks_summarized, Ordering::Relaxed);
        self.chunks_dropped
            .fetch_add(chunks_dropped, Ordering::Relaxed);
    }

    /// Record a request that ended in an error.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            summaries_completed: self.summaries_completed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Requests received since startup.
    pub requests: u64,
    /// Requests that produced a summary.
    pub summaries_completed: u64,
    /// Requests that failed at any stage.
    pub failures: u64,
    /// Chunks folded into summaries.
    pub chunks_summarized: u64,
    /// Chunks discarded by the leading-chunk truncation.
    pub chunks_dropped: u64,
}
