//! Lock-free ingestion counters
//!
//! The producer and every consumer worker record into one shared
//! `IngestStats` through relaxed atomics. A run ends with a single
//! `snapshot()` which is logged as `ingest_summary`.
//!
//! NOTE: Relaxed ordering throughout. These counters are statistics only;
//! never use them for coordination or control flow.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Parse latency bucket boundaries (microseconds)
/// Buckets: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120
const BUCKET_BOUNDS: [u64; 10] = [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Counters shared by the producer and the consumer pool
#[derive(Default)]
pub struct IngestStats {
    /// Raw lines returned by the reader, blank or not
    lines_read: AtomicU64,
    /// Lines skipped because they were empty
    blank_lines: AtomicU64,
    /// Non-empty lines pushed onto the line queue
    lines_pushed: AtomicU64,
    /// Lines parsed into a pick event
    lines_parsed: AtomicU64,
    /// Lines dropped as malformed
    lines_dropped: AtomicU64,
    /// Events drained from the results queue by the orchestrator
    events_collected: AtomicU64,
    parse_latency_sum_us: AtomicU64,
    parse_latency_max_us: AtomicU64,
    parse_latency_buckets: [AtomicU64; NUM_BUCKETS],
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_blank_line(&self) {
        self.blank_lines.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_line_pushed(&self) {
        self.lines_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one parse attempt
    #[inline]
    pub fn record_parse(&self, parsed: bool, latency_us: u64) {
        if parsed {
            self.lines_parsed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.lines_dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.parse_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.parse_latency_max_us, latency_us);
        self.parse_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_events_collected(&self, count: u64) {
        self.events_collected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn lines_pushed(&self) -> u64 {
        self.lines_pushed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> IngestSummary {
        let lines_parsed = self.lines_parsed.load(Ordering::Relaxed);
        let lines_dropped = self.lines_dropped.load(Ordering::Relaxed);
        let attempts = lines_parsed + lines_dropped;
        let latency_sum = self.parse_latency_sum_us.load(Ordering::Relaxed);

        IngestSummary {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            blank_lines: self.blank_lines.load(Ordering::Relaxed),
            lines_pushed: self.lines_pushed.load(Ordering::Relaxed),
            lines_parsed,
            lines_dropped,
            events_collected: self.events_collected.load(Ordering::Relaxed),
            parse_avg_us: if attempts > 0 { latency_sum / attempts } else { 0 },
            parse_max_us: self.parse_latency_max_us.load(Ordering::Relaxed),
            parse_buckets: load_buckets(&self.parse_latency_buckets),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub lines_read: u64,
    pub blank_lines: u64,
    pub lines_pushed: u64,
    pub lines_parsed: u64,
    pub lines_dropped: u64,
    pub events_collected: u64,
    pub parse_avg_us: u64,
    pub parse_max_us: u64,
    /// Parse latency histogram
    /// Bounds: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120 µs
    pub parse_buckets: [u64; NUM_BUCKETS],
}

impl IngestSummary {
    pub fn log(&self) {
        info!(
            lines_read = %self.lines_read,
            blank_lines = %self.blank_lines,
            lines_pushed = %self.lines_pushed,
            lines_parsed = %self.lines_parsed,
            lines_dropped = %self.lines_dropped,
            events_collected = %self.events_collected,
            parse_avg_us = %self.parse_avg_us,
            parse_max_us = %self.parse_max_us,
            "ingest_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = IngestStats::new();
        let summary = stats.snapshot();
        assert_eq!(summary.lines_read, 0);
        assert_eq!(summary.parse_avg_us, 0);
        assert_eq!(summary.parse_buckets, [0; NUM_BUCKETS]);
    }

    #[test]
    fn test_record_parse_outcomes() {
        let stats = IngestStats::new();

        stats.record_parse(true, 10);
        stats.record_parse(true, 30);
        stats.record_parse(false, 50);

        let summary = stats.snapshot();
        assert_eq!(summary.lines_parsed, 2);
        assert_eq!(summary.lines_dropped, 1);
        assert_eq!(summary.parse_avg_us, 30);
        assert_eq!(summary.parse_max_us, 50);
    }

    #[test]
    fn test_line_counters() {
        let stats = IngestStats::new();
        stats.record_line_read();
        stats.record_line_read();
        stats.record_blank_line();
        stats.record_line_pushed();
        stats.record_events_collected(4);

        let summary = stats.snapshot();
        assert_eq!(summary.lines_read, 2);
        assert_eq!(summary.blank_lines, 1);
        assert_eq!(summary.lines_pushed, 1);
        assert_eq!(stats.lines_pushed(), 1);
        assert_eq!(summary.events_collected, 4);
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(10), 0);
        assert_eq!(bucket_index(11), 1);
        assert_eq!(bucket_index(5120), 9);
        assert_eq!(bucket_index(5121), 10); // overflow
    }

    #[test]
    fn test_histogram_buckets() {
        let stats = IngestStats::new();
        stats.record_parse(true, 5);
        stats.record_parse(true, 15);
        stats.record_parse(false, 9000);

        let summary = stats.snapshot();
        assert_eq!(summary.parse_buckets[0], 1);
        assert_eq!(summary.parse_buckets[1], 1);
        assert_eq!(summary.parse_buckets[10], 1);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(IngestStats::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let s = stats.clone();
            handles.push(thread::spawn(move || {
                for i in 0..1000 {
                    s.record_parse(i % 2 == 0, i as u64);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        let summary = stats.snapshot();
        assert_eq!(summary.lines_parsed + summary.lines_dropped, 8000);
        assert_eq!(summary.parse_max_us, 999);
    }
}
