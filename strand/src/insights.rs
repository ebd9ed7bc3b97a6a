//! Insights - logging setup for strand.
//!
//! The core logs through `tracing` at lifecycle points only (processor
//! start/halt, gating changes, handler errors); nothing is emitted per event.
//! Per-event counters are zero-cost unless the `metrics` feature is enabled.
//!
//! # Usage
//!
//! ```rust,ignore
//! strand::init_tracing();
//! ```
//!
//! Applications that already install their own subscriber can skip this.

/// Install a `tracing-subscriber` fmt subscriber (call once at startup).
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt().with_target(true).with_thread_names(true).try_init().is_ok()
}

/// Record sequences made visible by a publish
#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_published(count: u64) {
    crate::metrics::METRICS.record_published(count);
}

#[cfg(not(feature = "metrics"))]
#[inline(always)]
pub(crate) fn record_published(_count: u64) {}

/// Record entries handled by one processor batch
#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_processed(count: u64) {
    crate::metrics::METRICS.record_processed(count);
}

#[cfg(not(feature = "metrics"))]
#[inline(always)]
pub(crate) fn record_processed(_count: u64) {}

/// Record that a producer hit a full ring and has to wait for consumers
#[inline]
pub(crate) fn record_backpressure(sequence: i64, wrap_point: i64, gating: i64) {
    crate::metrics::METRICS.record_producer_stall();
    tracing::trace!(sequence, wrap_point, gating, "producer waiting on gating sequences");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        assert!(!init_tracing());
    }

    #[test]
    fn test_record_backpressure_counts() {
        let before = crate::metrics::METRICS.snapshot().producer_stalls;
        record_backpressure(8, 0, -1);
        assert!(crate::metrics::METRICS.snapshot().producer_stalls > before);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_hot_path_counters_enabled() {
        let before = crate::metrics::METRICS.snapshot();
        record_published(3);
        record_processed(2);
        let after = crate::metrics::METRICS.snapshot();
        assert!(after.events_published >= before.events_published + 3);
        assert!(after.events_processed >= before.events_processed + 2);
    }

    #[cfg(not(feature = "metrics"))]
    #[test]
    fn test_hot_path_counters_compiled_out() {
        let before = crate::metrics::METRICS.snapshot();
        record_published(3);
        record_processed(2);
        let after = crate::metrics::METRICS.snapshot();
        assert_eq!(after.events_published, before.events_published);
        assert_eq!(after.events_processed, before.events_processed);
    }
}
