//! Sequence counters.
//!
//! - `Sequence` - atomic i64 progress marker (acquire loads, release stores)
//! - `PaddedSequence` - `Sequence` alone on its cache line
//! - `PaddedLong` - padded plain counter for thread-confined claim state
//!
//! Every counter starts at `INITIAL_CURSOR_VALUE` (-1): nothing produced or
//! consumed yet.

use std::cell::Cell;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;

use static_assertions::{ assert_eq_size, assert_impl_all, assert_not_impl_any, const_assert_eq };

use crate::constants::{ CACHE_LINE_SIZE, INITIAL_CURSOR_VALUE };

const PADDING_BYTES: usize = CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>();

/// Shared handle to a padded sequence, as held by sequencers, barriers and processors
pub type SharedSequence = Arc<PaddedSequence>;

/// Atomic sequence counter.
///
/// Owned by one producer or consumer, read by many. Loads are `Acquire` and
/// writes are `Release`, so a reader that observes value `v` also observes
/// every slot write that happened before the owner published `v`.
pub struct Sequence {
    value: AtomicI64,
}

impl Sequence {
    pub const fn new(initial_value: i64) -> Self {
        Self {
            value: AtomicI64::new(initial_value),
        }
    }

    #[inline(always)]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Atomically add `delta` and return the new value.
    #[inline(always)]
    pub fn increment_and_get(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel) + delta
    }

    /// Set to `new_value` only if the current value is `expected`.
    #[inline(always)]
    pub fn compare_and_set(&self, expected: i64, new_value: i64) -> bool {
        self.value
            .compare_exchange(expected, new_value, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sequence").field(&self.get()).finish()
    }
}

/// Cache-line padded sequence.
///
/// Can sit next to other counters in memory without false sharing: the
/// atomic is the only mutable field on its line.
#[repr(C, align(64))]
pub struct PaddedSequence {
    sequence: Sequence,
    _padding: [u8; PADDING_BYTES],
}

assert_eq_size!(PaddedSequence, [u8; CACHE_LINE_SIZE]);
const_assert_eq!(std::mem::align_of::<PaddedSequence>(), CACHE_LINE_SIZE);
assert_impl_all!(PaddedSequence: Send, Sync);

impl PaddedSequence {
    pub const fn new(initial_value: i64) -> Self {
        Self {
            sequence: Sequence::new(initial_value),
            _padding: [0; PADDING_BYTES],
        }
    }

    /// New shared handle starting at `initial_value`
    pub fn shared(initial_value: i64) -> SharedSequence {
        Arc::new(Self::new(initial_value))
    }
}

impl Deref for PaddedSequence {
    type Target = Sequence;

    #[inline(always)]
    fn deref(&self) -> &Sequence {
        &self.sequence
    }
}

impl Default for PaddedSequence {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }
}

impl fmt::Debug for PaddedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PaddedSequence").field(&self.get()).finish()
    }
}

/// Cache-line padded, NON-atomic counter.
///
/// Not thread safe: `Cell` makes it `!Sync`, so it can only live inside a
/// value that a single thread owns (e.g. the single-producer claim state).
#[repr(C, align(64))]
pub struct PaddedLong {
    value: Cell<i64>,
    _padding: [u8; PADDING_BYTES],
}

assert_eq_size!(PaddedLong, [u8; CACHE_LINE_SIZE]);
assert_not_impl_any!(PaddedLong: Sync);

impl PaddedLong {
    pub const fn new(initial_value: i64) -> Self {
        Self {
            value: Cell::new(initial_value),
            _padding: [0; PADDING_BYTES],
        }
    }

    #[inline(always)]
    pub fn get(&self) -> i64 {
        self.value.get()
    }

    #[inline(always)]
    pub fn set(&self, value: i64) {
        self.value.set(value);
    }

    #[inline(always)]
    pub fn increment_and_get(&self, delta: i64) -> i64 {
        let next = self.value.get() + delta;
        self.value.set(next);
        next
    }
}

impl Default for PaddedLong {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }
}

impl fmt::Debug for PaddedLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PaddedLong").field(&self.get()).finish()
    }
}

/// Smallest value among `sequences`, capped at `minimum`.
///
/// Returns `minimum` when `sequences` is empty.
#[inline]
pub fn minimum_sequence(sequences: &[SharedSequence], minimum: i64) -> i64 {
    sequences.iter().fold(minimum, |min, sequence| min.min(sequence.get()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initial_value() {
        assert_eq!(Sequence::default().get(), INITIAL_CURSOR_VALUE);
        assert_eq!(PaddedSequence::default().get(), INITIAL_CURSOR_VALUE);
        assert_eq!(PaddedLong::default().get(), INITIAL_CURSOR_VALUE);
    }

    #[test]
    fn test_set_and_increment() {
        let seq = Sequence::new(0);
        seq.set(41);
        assert_eq!(seq.get(), 41);
        assert_eq!(seq.increment_and_get(1), 42);
        assert_eq!(seq.increment_and_get(8), 50);
    }

    #[test]
    fn test_compare_and_set() {
        let seq = PaddedSequence::new(5);
        assert!(seq.compare_and_set(5, 9));
        assert_eq!(seq.get(), 9);

        // Stale expectation leaves the value alone
        assert!(!seq.compare_and_set(5, 11));
        assert_eq!(seq.get(), 9);
    }

    #[test]
    fn test_padded_layout() {
        assert_eq!(std::mem::size_of::<PaddedSequence>(), CACHE_LINE_SIZE);
        assert_eq!(std::mem::align_of::<PaddedSequence>(), CACHE_LINE_SIZE);

        let seqs = [PaddedSequence::new(0), PaddedSequence::new(1)];
        let a = &seqs[0] as *const PaddedSequence as usize;
        let b = &seqs[1] as *const PaddedSequence as usize;
        assert_eq!(a % CACHE_LINE_SIZE, 0);
        assert_eq!(b - a, CACHE_LINE_SIZE);
    }

    #[test]
    fn test_padded_long() {
        let counter = PaddedLong::new(0);
        assert_eq!(counter.increment_and_get(3), 3);
        counter.set(10);
        assert_eq!(counter.get(), 10);
        assert_eq!(std::mem::align_of::<PaddedLong>(), CACHE_LINE_SIZE);
    }

    #[test]
    fn test_minimum_sequence() {
        let seqs = vec![
            PaddedSequence::shared(7),
            PaddedSequence::shared(3),
            PaddedSequence::shared(12)
        ];
        assert_eq!(minimum_sequence(&seqs, i64::MAX), 3);
        assert_eq!(minimum_sequence(&seqs, 1), 1);
        assert_eq!(minimum_sequence(&[], 42), 42);
    }

    #[test]
    fn test_concurrent_increments() {
        let seq = PaddedSequence::shared(0);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = seq.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        seq.increment_and_get(1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(seq.get(), 40_000);
    }
}
