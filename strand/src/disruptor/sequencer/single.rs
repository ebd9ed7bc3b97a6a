//! Single-producer sequencer.
//!
//! Claim state lives in `PaddedLong`s owned by this handle: no atomics on
//! the claim path, and the handle is `!Sync` so only one thread can claim.

use std::fmt;
use std::sync::Arc;

use crate::constants::INITIAL_CURSOR_VALUE;
use crate::disruptor::sequence::PaddedLong;
use crate::disruptor::sequencer::{ Sequencer, SequencerCore };
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::{ Result, StrandError };

pub struct SingleProducerSequencer<W: WaitStrategy> {
    core: Arc<SequencerCore<W>>,
    /// Highest sequence claimed so far
    next_value: PaddedLong,
    /// Last observed `min(gating sequences)`
    cached_gating: PaddedLong,
}

impl<W: WaitStrategy> SingleProducerSequencer<W> {
    pub fn new(buffer_size: usize, wait_strategy: W) -> Result<Self> {
        Self::with_shared_strategy(buffer_size, Arc::new(wait_strategy))
    }

    pub fn with_shared_strategy(buffer_size: usize, wait_strategy: Arc<W>) -> Result<Self> {
        Ok(Self {
            core: Arc::new(SequencerCore::new(buffer_size, wait_strategy)?),
            next_value: PaddedLong::new(INITIAL_CURSOR_VALUE),
            cached_gating: PaddedLong::new(INITIAL_CURSOR_VALUE),
        })
    }

    fn capacity_for(&self, n: i64) -> bool {
        let next_value = self.next_value.get();
        let wrap_point = next_value + n - self.core.buffer_size();
        let cached = self.cached_gating.get();

        if wrap_point > cached || cached > next_value {
            let min = self.core.minimum_gating_sequence(next_value);
            self.cached_gating.set(min);
            if wrap_point > min {
                return false;
            }
        }
        true
    }
}

impl<W: WaitStrategy> Sequencer for SingleProducerSequencer<W> {
    type Wait = W;

    fn core(&self) -> &SequencerCore<W> {
        &self.core
    }

    fn next(&mut self, n: i64) -> i64 {
        self.core.check_batch_size(n);

        let next_value = self.next_value.get();
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.core.buffer_size();
        let cached = self.cached_gating.get();

        if wrap_point > cached || cached > next_value {
            let min = self.core.wait_for_gating(wrap_point, || next_value);
            self.cached_gating.set(min);
        }

        self.next_value.set(next_sequence);
        next_sequence
    }

    fn try_next(&mut self, n: i64) -> Result<i64> {
        self.core.check_batch_size(n);

        if !self.capacity_for(n) {
            return Err(StrandError::InsufficientCapacity);
        }
        Ok(self.next_value.increment_and_get(n))
    }

    fn publish_range(&self, low: i64, high: i64) {
        debug_assert!(low <= high, "publish_range: low {} > high {}", low, high);
        self.core.cursor().set(high);
        self.core.signal(high - low + 1);
    }

    fn has_available_capacity(&self, n: i64) -> bool {
        self.capacity_for(n)
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.next_value.get();
        let consumed = self.core.minimum_gating_sequence(produced);
        self.core.buffer_size() - (produced - consumed)
    }
}

impl<W: WaitStrategy> fmt::Debug for SingleProducerSequencer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleProducerSequencer")
            .field("core", &self.core)
            .field("next_value", &self.next_value.get())
            .finish()
    }
}
