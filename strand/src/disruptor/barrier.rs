//! Sequence barrier: the "how far may I read" answer for one consumer.
//!
//! Reduces the producer cursor and the consumer's upstream dependencies to a
//! single available sequence with `min()`, and carries the alert flag used to
//! cancel a blocked `wait_for`.

use std::fmt;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

use crate::disruptor::sequence::SharedSequence;
use crate::disruptor::wait_strategy::{ available_sequence, WaitStrategy };
use crate::error::{ Result, StrandError };
use crate::metrics::METRICS;

/// Coordination barrier between a consumer and everything it depends on.
///
/// With no dependents the barrier watches the producer cursor alone.
pub struct SequenceBarrier<W: WaitStrategy> {
    wait_strategy: Arc<W>,
    cursor: SharedSequence,
    dependents: Box<[SharedSequence]>,
    alerted: AtomicBool,
}

impl<W: WaitStrategy> SequenceBarrier<W> {
    pub fn new(wait_strategy: Arc<W>, cursor: SharedSequence, dependents: &[SharedSequence]) -> Self {
        Self {
            wait_strategy,
            cursor,
            dependents: dependents.to_vec().into_boxed_slice(),
            alerted: AtomicBool::new(false),
        }
    }

    /// Wait until `sequence` is available, returning the highest available
    /// sequence (`>= sequence`).
    ///
    /// Returns `StrandError::Alerted` if the barrier is or becomes alerted, and
    /// whatever the wait strategy reports otherwise (e.g. `Timeout`).
    pub fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;
        self.wait_strategy.wait_for(sequence, &self.cursor, &self.dependents, &self.alerted)
    }

    /// Non-blocking probe of `min(cursor, dependents...)`
    #[inline]
    pub fn get_available_sequence(&self) -> i64 {
        available_sequence(&self.cursor, &self.dependents)
    }

    /// Producer cursor this barrier tracks
    pub fn cursor(&self) -> &SharedSequence {
        &self.cursor
    }

    pub fn dependents(&self) -> &[SharedSequence] {
        &self.dependents
    }

    /// Raise the alert flag and wake any thread parked on this barrier.
    pub fn alert(&self) {
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
        METRICS.record_alert();
    }

    pub fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    /// `Err(Alerted)` if the barrier is alerted
    pub fn check_alert(&self) -> Result<()> {
        if self.is_alerted() { Err(StrandError::Alerted) } else { Ok(()) }
    }
}

impl<W: WaitStrategy> fmt::Debug for SequenceBarrier<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceBarrier")
            .field("cursor", &self.cursor.get())
            .field("dependents", &self.dependents.len())
            .field("alerted", &self.is_alerted())
            .finish()
    }
}
