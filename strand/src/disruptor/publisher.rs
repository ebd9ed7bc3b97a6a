//! Closure-based publishing on top of a sequencer and its ring.
//!
//! `Publisher` runs the claim → write → publish protocol so callers never
//! touch slots directly:
//!
//! ```rust,ignore
//! let mut publisher = Publisher::new(ring.clone(), sequencer)?;
//! publisher.publish_event(|slot, seq| slot.value = seq as u64);
//! ```

use std::sync::Arc;

use crate::disruptor::ring_buffer::RingBuffer;
use crate::disruptor::sequencer::Sequencer;
use crate::error::Result;

/// Producer handle pairing a sequencer with the ring it sequences.
///
/// A writer closure must not panic: a claimed sequence that is never
/// published stalls every consumer (and, for a multi-producer sequencer,
/// every later producer).
pub struct Publisher<T, S: Sequencer> {
    ring: Arc<RingBuffer<T>>,
    sequencer: S,
}

impl<T, S: Sequencer> Publisher<T, S> {
    pub fn new(ring: Arc<RingBuffer<T>>, sequencer: S) -> Result<Self> {
        if ring.size() != sequencer.buffer_size() {
            return Err(
                crate::config_error!(
                    "Ring buffer size {} does not match sequencer buffer size {}",
                    ring.size(),
                    sequencer.buffer_size()
                )
            );
        }
        Ok(Self { ring, sequencer })
    }

    pub fn ring(&self) -> &Arc<RingBuffer<T>> {
        &self.ring
    }

    pub fn sequencer(&self) -> &S {
        &self.sequencer
    }

    /// Claim one slot (waiting for consumers if the ring is full), fill it and publish.
    #[inline]
    pub fn publish_event<F>(&mut self, writer: F) -> i64 where F: FnOnce(&mut T, i64) {
        let sequence = self.sequencer.next(1);
        // Safety: `sequence` is claimed by this handle and not yet published.
        writer(unsafe { self.ring.get_mut(sequence) }, sequence);
        self.sequencer.publish(sequence);
        sequence
    }

    /// Claim `count` slots in one step and publish them together.
    ///
    /// The writer gets the slot, its sequence and the index within the batch.
    /// Returns the highest published sequence.
    ///
    /// # Panics
    /// If `count` is zero or larger than the ring.
    pub fn publish_events<F>(&mut self, count: usize, mut writer: F) -> i64
        where F: FnMut(&mut T, i64, usize)
    {
        let high = self.sequencer.next(count as i64);
        let low = high - (count as i64) + 1;
        for (i, sequence) in (low..=high).enumerate() {
            writer(unsafe { self.ring.get_mut(sequence) }, sequence, i);
        }
        self.sequencer.publish_range(low, high);
        high
    }

    /// Like `publish_event`, but fails with `InsufficientCapacity` instead
    /// of waiting when the ring is full.
    pub fn try_publish_event<F>(&mut self, writer: F) -> Result<i64> where F: FnOnce(&mut T, i64) {
        let sequence = self.sequencer.try_next(1)?;
        writer(unsafe { self.ring.get_mut(sequence) }, sequence);
        self.sequencer.publish(sequence);
        Ok(sequence)
    }
}

impl<T, S: Sequencer + Clone> Clone for Publisher<T, S> {
    fn clone(&self) -> Self {
        Self {
            ring: self.ring.clone(),
            sequencer: self.sequencer.clone(),
        }
    }
}
