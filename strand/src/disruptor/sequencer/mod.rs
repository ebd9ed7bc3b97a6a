//! Sequencers: producer-side claim and publish.
//!
//! - `SingleProducerSequencer` - one producer thread, claims are plain increments
//! - `MultiProducerSequencer` - any number of producer threads, atomic claims
//!   and publication serialised into sequence order
//!
//! Both gate claims on the slowest registered consumer so a producer never
//! overwrites a slot that is still being read. The rule is the one from the
//! original Disruptor: sequence `s` may be claimed once
//! `s - buffer_size <= min(gating sequences)`.

pub mod single;
pub mod multi;

pub use single::SingleProducerSequencer;
pub use multi::MultiProducerSequencer;

use std::fmt;
use std::sync::Arc;
use std::thread;

use arc_swap::ArcSwap;
use crossbeam::utils::Backoff;

use crate::constants::{ GATING_PARK_INTERVAL, INITIAL_CURSOR_VALUE };
use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::ring_buffer::validate_size;
use crate::disruptor::sequence::{ minimum_sequence, PaddedSequence, SharedSequence };
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::Result;
use crate::insights;

/// Producer-side coordination.
///
/// `next`/`try_next` take `&mut self`: a single-producer sequencer is one
/// handle owned by one thread, while a multi-producer sequencer is cloned
/// once per producer thread.
pub trait Sequencer: Send {
    type Wait: WaitStrategy;

    /// State shared by every handle of this sequencer
    fn core(&self) -> &SequencerCore<Self::Wait>;

    /// Claim `n` consecutive sequences and return the highest.
    ///
    /// Blocks while the claim would lap the slowest gating sequence.
    ///
    /// # Panics
    /// If `n` is not in `1..=buffer_size`.
    fn next(&mut self, n: i64) -> i64;

    /// Like `next`, but returns `StrandError::InsufficientCapacity` instead
    /// of waiting for consumers.
    fn try_next(&mut self, n: i64) -> Result<i64>;

    /// Make `low..=high` visible to consumers.
    fn publish_range(&self, low: i64, high: i64);

    /// Whether `n` more sequences can be claimed without waiting
    fn has_available_capacity(&self, n: i64) -> bool;

    /// Slots that can be claimed before the slowest consumer is lapped
    fn remaining_capacity(&self) -> i64;

    /// Make `sequence` visible to consumers.
    fn publish(&self, sequence: i64) {
        self.publish_range(sequence, sequence);
    }

    fn buffer_size(&self) -> usize {
        self.core().buffer_size() as usize
    }

    /// Published cursor: everything up to it is fully written
    fn cursor(&self) -> SharedSequence {
        self.core().cursor().clone()
    }

    fn add_gating_sequences(&self, sequences: &[SharedSequence]) {
        self.core().add_gating_sequences(sequences);
    }

    /// Returns how many of `sequences` were registered and are now removed
    fn remove_gating_sequences(&self, sequences: &[SharedSequence]) -> usize {
        self.core().remove_gating_sequences(sequences)
    }

    /// Barrier over this sequencer's cursor plus `dependents`
    fn new_barrier(&self, dependents: &[SharedSequence]) -> Arc<SequenceBarrier<Self::Wait>> {
        self.core().new_barrier(dependents)
    }
}

impl<S: Sequencer + ?Sized> Sequencer for Box<S> {
    type Wait = S::Wait;

    fn core(&self) -> &SequencerCore<Self::Wait> {
        (**self).core()
    }

    fn next(&mut self, n: i64) -> i64 {
        (**self).next(n)
    }

    fn try_next(&mut self, n: i64) -> Result<i64> {
        (**self).try_next(n)
    }

    fn publish_range(&self, low: i64, high: i64) {
        (**self).publish_range(low, high)
    }

    fn has_available_capacity(&self, n: i64) -> bool {
        (**self).has_available_capacity(n)
    }

    fn remaining_capacity(&self) -> i64 {
        (**self).remaining_capacity()
    }

    fn publish(&self, sequence: i64) {
        (**self).publish(sequence)
    }
}

/// Shared half of a sequencer: cursor, gating sequences and wait strategy.
///
/// The gating set is a copy-on-write snapshot: claims read it without
/// locking, registration swaps in a new one.
pub struct SequencerCore<W: WaitStrategy> {
    buffer_size: i64,
    cursor: SharedSequence,
    gating_sequences: ArcSwap<Vec<SharedSequence>>,
    wait_strategy: Arc<W>,
}

impl<W: WaitStrategy> SequencerCore<W> {
    pub fn new(buffer_size: usize, wait_strategy: Arc<W>) -> Result<Self> {
        validate_size(buffer_size)?;

        Ok(Self {
            buffer_size: buffer_size as i64,
            cursor: PaddedSequence::shared(INITIAL_CURSOR_VALUE),
            gating_sequences: ArcSwap::from_pointee(Vec::new()),
            wait_strategy,
        })
    }

    #[inline(always)]
    pub fn buffer_size(&self) -> i64 {
        self.buffer_size
    }

    #[inline(always)]
    pub fn cursor(&self) -> &SharedSequence {
        &self.cursor
    }

    pub fn wait_strategy(&self) -> &Arc<W> {
        &self.wait_strategy
    }

    /// `min(gating sequences)`, or `minimum` when smaller or nothing is registered
    #[inline]
    pub fn minimum_gating_sequence(&self, minimum: i64) -> i64 {
        minimum_sequence(&self.gating_sequences.load(), minimum)
    }

    pub fn gating_sequence_count(&self) -> usize {
        self.gating_sequences.load().len()
    }

    /// Register consumers; each starts at the current cursor so it neither
    /// stalls the producer nor gets lapped.
    ///
    /// A producer may still be reading the previous snapshot while the new
    /// one is swapped in, so the sequences are moved up to the cursor again
    /// afterwards. Claims made from the old snapshot never pass that cursor
    /// plus the buffer size.
    pub fn add_gating_sequences(&self, sequences: &[SharedSequence]) {
        let cursor = self.cursor.get();
        for sequence in sequences {
            sequence.set(cursor);
        }

        let previous = self.gating_sequences.rcu(|current| {
            let mut next: Vec<SharedSequence> = (**current).clone();
            next.extend(sequences.iter().cloned());
            next
        });

        let cursor = self.cursor.get();
        for sequence in sequences {
            sequence.set(cursor);
        }
        tracing::debug!(
            added = sequences.len(),
            total = previous.len() + sequences.len(),
            cursor,
            "gating sequences added"
        );
    }

    pub fn remove_gating_sequences(&self, sequences: &[SharedSequence]) -> usize {
        let mut removed = 0;
        let mut remaining = 0;
        self.gating_sequences.rcu(|current| {
            let next: Vec<SharedSequence> = current
                .iter()
                .filter(|existing| !sequences.iter().any(|s| Arc::ptr_eq(*existing, s)))
                .cloned()
                .collect();
            removed = current.len() - next.len();
            remaining = next.len();
            next
        });
        tracing::debug!(removed, total = remaining, "gating sequences removed");
        removed
    }

    pub fn new_barrier(&self, dependents: &[SharedSequence]) -> Arc<SequenceBarrier<W>> {
        Arc::new(SequenceBarrier::new(self.wait_strategy.clone(), self.cursor.clone(), dependents))
    }

    /// Wait until `wrap_point <= min(gating sequences)` and return that minimum.
    ///
    /// Consumers do not signal when they advance, so this backs off (spin,
    /// then yield, then short parks) rather than using the wait strategy.
    pub(crate) fn wait_for_gating<F>(&self, wrap_point: i64, minimum: F) -> i64
        where F: Fn() -> i64
    {
        let mut min = self.minimum_gating_sequence(minimum());
        if wrap_point <= min {
            return min;
        }

        insights::record_backpressure(wrap_point + self.buffer_size, wrap_point, min);
        let backoff = Backoff::new();
        while wrap_point > min {
            if backoff.is_completed() {
                thread::park_timeout(GATING_PARK_INTERVAL);
            } else {
                backoff.snooze();
            }
            min = self.minimum_gating_sequence(minimum());
        }
        min
    }

    /// Wake consumers after the cursor moved
    #[inline]
    pub(crate) fn signal(&self, published: i64) {
        self.wait_strategy.signal_all_when_blocking();
        insights::record_published(published as u64);
    }

    #[inline]
    pub(crate) fn check_batch_size(&self, n: i64) {
        assert!(
            n >= 1 && n <= self.buffer_size,
            "claim size {} must be between 1 and the buffer size {}",
            n,
            self.buffer_size
        );
    }
}

impl<W: WaitStrategy> fmt::Debug for SequencerCore<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequencerCore")
            .field("buffer_size", &self.buffer_size)
            .field("cursor", &self.cursor.get())
            .field("gating_sequences", &self.gating_sequence_count())
            .finish()
    }
}
