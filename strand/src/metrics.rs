//! Metrics for strand sequencers and processors.
//!
//! Lightweight relaxed counters, recorded per claim/batch, never per spin.
//! Each counter sits on its own cache line.
//!
//! Stall, alert and handler-error counters are always on. Published and
//! processed counts are recorded only with the `metrics` feature:
//!
//! ```toml
//! strand = { version = "0.1", features = ["metrics"] }
//! ```

use std::sync::atomic::{ AtomicU64, Ordering };

use crossbeam::utils::CachePadded;

/// Global metrics counters
pub struct Metrics {
    pub events_published: CachePadded<AtomicU64>,
    pub events_processed: CachePadded<AtomicU64>,
    pub handler_errors: CachePadded<AtomicU64>,
    pub producer_stalls: CachePadded<AtomicU64>,
    pub alerts: CachePadded<AtomicU64>,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_published: CachePadded::new(AtomicU64::new(0)),
            events_processed: CachePadded::new(AtomicU64::new(0)),
            handler_errors: CachePadded::new(AtomicU64::new(0)),
            producer_stalls: CachePadded::new(AtomicU64::new(0)),
            alerts: CachePadded::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub fn record_published(&self, count: u64) {
        self.events_published.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_processed(&self, count: u64) {
        self.events_processed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A producer found the ring full and had to wait for consumers
    #[inline]
    pub fn record_producer_stall(&self) {
        self.producer_stalls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alert(&self) {
        self.alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_published: self.events_published.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            producer_stalls: self.producer_stalls.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.events_published.store(0, Ordering::Relaxed);
        self.events_processed.store(0, Ordering::Relaxed);
        self.handler_errors.store(0, Ordering::Relaxed);
        self.producer_stalls.store(0, Ordering::Relaxed);
        self.alerts.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_published: u64,
    pub events_processed: u64,
    pub handler_errors: u64,
    pub producer_stalls: u64,
    pub alerts: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "published={} processed={} handler_errors={} stalls={} alerts={}",
            self.events_published,
            self.events_processed,
            self.handler_errors,
            self.producer_stalls,
            self.alerts
        )
    }
}

/// Global metrics instance
pub static METRICS: Metrics = Metrics::new();
