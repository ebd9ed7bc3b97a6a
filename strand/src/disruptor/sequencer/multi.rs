//! Multi-producer sequencer.
//!
//! Claims come from a shared claim sequence that runs ahead of the cursor.
//! Publication is serialised: a producer publishing `low..=high` waits until
//! the cursor reaches `low - 1`, so the cursor only ever advances over a
//! contiguous run of fully written slots even when producers finish out of
//! order.

use std::fmt;
use std::sync::Arc;

use crossbeam::utils::Backoff;

use crate::constants::INITIAL_CURSOR_VALUE;
use crate::disruptor::sequence::{ PaddedSequence, SharedSequence };
use crate::disruptor::sequencer::{ Sequencer, SequencerCore };
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::{ Result, StrandError };

/// Cloneable handle; give each producer thread its own clone.
pub struct MultiProducerSequencer<W: WaitStrategy> {
    core: Arc<SequencerCore<W>>,
    /// Highest sequence handed out to any producer
    claim: SharedSequence,
    /// Last observed `min(gating sequences)`, shared by all producers
    gating_cache: SharedSequence,
}

impl<W: WaitStrategy> MultiProducerSequencer<W> {
    pub fn new(buffer_size: usize, wait_strategy: W) -> Result<Self> {
        Self::with_shared_strategy(buffer_size, Arc::new(wait_strategy))
    }

    pub fn with_shared_strategy(buffer_size: usize, wait_strategy: Arc<W>) -> Result<Self> {
        Ok(Self {
            core: Arc::new(SequencerCore::new(buffer_size, wait_strategy)?),
            claim: PaddedSequence::shared(INITIAL_CURSOR_VALUE),
            gating_cache: PaddedSequence::shared(INITIAL_CURSOR_VALUE),
        })
    }

    /// Highest claimed sequence; may be ahead of the cursor
    pub fn claimed(&self) -> i64 {
        self.claim.get()
    }

    fn capacity_from(&self, current: i64, n: i64) -> bool {
        let wrap_point = current + n - self.core.buffer_size();
        let cached = self.gating_cache.get();

        if wrap_point > cached || cached > current {
            let min = self.core.minimum_gating_sequence(self.core.cursor().get());
            self.gating_cache.set(min);
            if wrap_point > min {
                return false;
            }
        }
        true
    }
}

impl<W: WaitStrategy> Clone for MultiProducerSequencer<W> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            claim: self.claim.clone(),
            gating_cache: self.gating_cache.clone(),
        }
    }
}

impl<W: WaitStrategy> Sequencer for MultiProducerSequencer<W> {
    type Wait = W;

    fn core(&self) -> &SequencerCore<W> {
        &self.core
    }

    fn next(&mut self, n: i64) -> i64 {
        self.core.check_batch_size(n);

        let next = self.claim.increment_and_get(n);
        let wrap_point = next - self.core.buffer_size();

        if wrap_point > self.gating_cache.get() {
            let cursor = self.core.cursor();
            let min = self.core.wait_for_gating(wrap_point, || cursor.get());
            self.gating_cache.set(min);
        }
        next
    }

    fn try_next(&mut self, n: i64) -> Result<i64> {
        self.core.check_batch_size(n);

        let backoff = Backoff::new();
        loop {
            let current = self.claim.get();
            let next = current + n;

            if !self.capacity_from(current, n) {
                return Err(StrandError::InsufficientCapacity);
            }
            if self.claim.compare_and_set(current, next) {
                return Ok(next);
            }
            backoff.spin();
        }
    }

    fn publish_range(&self, low: i64, high: i64) {
        debug_assert!(low <= high, "publish_range: low {} > high {}", low, high);

        let cursor = self.core.cursor();
        let expected = low - 1;
        let backoff = Backoff::new();
        while cursor.get() < expected {
            backoff.snooze();
        }

        cursor.set(high);
        self.core.signal(high - low + 1);
    }

    fn has_available_capacity(&self, n: i64) -> bool {
        self.capacity_from(self.claim.get(), n)
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.claim.get();
        let consumed = self.core.minimum_gating_sequence(self.core.cursor().get());
        self.core.buffer_size() - (produced - consumed)
    }
}

impl<W: WaitStrategy> fmt::Debug for MultiProducerSequencer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiProducerSequencer")
            .field("core", &self.core)
            .field("claimed", &self.claim.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::wait_strategy::{ BusySpinWaitStrategy, YieldingWaitStrategy };
    use std::collections::HashSet;
    use std::sync::atomic::{ AtomicBool, Ordering };
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_concurrent_claims_are_unique_and_gapless() {
        const PRODUCERS: usize = 4;
        const CLAIMS: usize = 2_000;

        let sequencer = MultiProducerSequencer::new(1 << 16, BusySpinWaitStrategy).unwrap();
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let mut sequencer = sequencer.clone();
                thread::spawn(move || (0..CLAIMS).map(|_| sequencer.next(1)).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for seq in handle.join().unwrap() {
                assert!(seen.insert(seq), "sequence {} claimed twice", seq);
            }
        }

        let total = (PRODUCERS * CLAIMS) as i64;
        assert_eq!(seen.len() as i64, total);
        assert!((0..total).all(|s| seen.contains(&s)));
        assert_eq!(sequencer.claimed(), total - 1);
    }

    #[test]
    fn test_out_of_order_publish_is_serialised() {
        let mut a = MultiProducerSequencer::new(8, YieldingWaitStrategy::new()).unwrap();
        let mut b = a.clone();
        assert_eq!(a.next(1), 0);
        assert_eq!(b.next(1), 1);

        let published = Arc::new(AtomicBool::new(false));
        let late = {
            let published = published.clone();
            thread::spawn(move || {
                b.publish(1);
                published.store(true, Ordering::Release);
            })
        };

        thread::sleep(Duration::from_millis(30));
        assert!(!published.load(Ordering::Acquire));
        assert_eq!(a.cursor().get(), INITIAL_CURSOR_VALUE);

        a.publish(0);
        late.join().unwrap();
        assert_eq!(a.cursor().get(), 1);
    }

    #[test]
    fn test_try_next_respects_gating() {
        let mut sequencer = MultiProducerSequencer::new(4, BusySpinWaitStrategy).unwrap();
        let consumer = PaddedSequence::shared(-1);
        sequencer.add_gating_sequences(&[consumer.clone()]);

        assert_eq!(sequencer.try_next(4).unwrap(), 3);
        assert_eq!(sequencer.try_next(1), Err(StrandError::InsufficientCapacity));
        assert_eq!(sequencer.remaining_capacity(), 0);

        sequencer.publish_range(0, 3);
        consumer.set(1);
        assert!(sequencer.has_available_capacity(2));
        assert_eq!(sequencer.try_next(2).unwrap(), 5);
        assert_eq!(sequencer.remaining_capacity(), 0);
    }

    #[test]
    fn test_batch_publish_moves_cursor_once() {
        let mut sequencer = MultiProducerSequencer::new(16, BusySpinWaitStrategy).unwrap();
        let high = sequencer.next(5);
        assert_eq!(high, 4);
        sequencer.publish_range(high - 4, high);
        assert_eq!(sequencer.cursor().get(), 4);
    }
}
