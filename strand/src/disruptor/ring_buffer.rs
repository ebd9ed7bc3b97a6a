//! Fixed-capacity circular slot storage.
//!
//! Slots are pre-allocated at construction and overwritten in place on every
//! lap; sequence `s` lives at `s & (size - 1)`. The buffer performs no
//! sequencing of its own: claim/publish through a `Sequencer` and read only
//! what a `SequenceBarrier` reports as available.

use std::cell::UnsafeCell;
use std::fmt;

use crate::constants::MAX_RING_BUFFER_SIZE;
use crate::disruptor::RingBufferConfig;
use crate::error::{ Result, StrandError };

pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    mask: usize,
}

// Slot access is coordinated by the sequence protocol, not by the type system:
// a slot is written by the one producer that claimed it and read only after
// its publication is acquire-visible.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}

impl<T: Default> RingBuffer<T> {
    /// Create a ring with `size` default-initialised slots
    pub fn new(size: usize) -> Result<Self> {
        Self::with_factory(size, T::default)
    }

    pub fn from_config(config: &RingBufferConfig) -> Result<Self> {
        Self::new(config.size)
    }
}

impl<T> RingBuffer<T> {
    /// Create a ring whose slots are pre-filled by `factory`
    pub fn with_factory<F>(size: usize, mut factory: F) -> Result<Self> where F: FnMut() -> T {
        validate_size(size)?;

        let slots = (0..size)
            .map(|_| UnsafeCell::new(factory()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            mask: size - 1,
        })
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    pub fn index_of(&self, sequence: i64) -> usize {
        (sequence as usize) & self.mask
    }

    /// Shared reference to the slot for `sequence`.
    ///
    /// # Safety
    /// `sequence` must be published and available through the caller's
    /// barrier, and must not be lapped by a producer while the reference lives
    /// (guaranteed while the caller's sequence gates the producer).
    #[inline(always)]
    pub unsafe fn get(&self, sequence: i64) -> &T {
        &*self.slots.get_unchecked(self.index_of(sequence)).get()
    }

    /// Exclusive reference to the slot for `sequence`.
    ///
    /// # Safety
    /// `sequence` must be claimed by the caller and not yet published; no
    /// other reference to the slot may exist while this one lives.
    #[allow(clippy::mut_from_ref)]
    #[inline(always)]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut T {
        &mut *self.slots.get_unchecked(self.index_of(sequence)).get()
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer").field("size", &self.size()).finish()
    }
}

pub(crate) fn validate_size(size: usize) -> Result<()> {
    let result = if size == 0 {
        Err(StrandError::config("Ring buffer size must be greater than 0"))
    } else if !size.is_power_of_two() {
        Err(StrandError::config("Ring buffer size must be power of 2"))
    } else if size > MAX_RING_BUFFER_SIZE {
        Err(crate::config_error!("Ring buffer size cannot exceed {}", MAX_RING_BUFFER_SIZE))
    } else {
        Ok(())
    };

    if let Err(ref err) = result {
        tracing::debug!(size, %err, "rejected ring buffer size");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sizes() {
        assert!(RingBuffer::<u64>::new(0).is_err());
        assert!(RingBuffer::<u64>::new(3).is_err());
        assert!(RingBuffer::<u64>::new(1000).is_err());
        assert!(RingBuffer::<u64>::new(MAX_RING_BUFFER_SIZE * 2).is_err());
    }

    #[test]
    fn test_oversized_error_names_the_limit() {
        let err = validate_size(MAX_RING_BUFFER_SIZE * 2).unwrap_err();
        assert!(matches!(err, StrandError::InvalidConfig { .. }));
        assert!(err.to_string().contains(&MAX_RING_BUFFER_SIZE.to_string()));
    }

    #[test]
    fn test_single_slot_ring() {
        let ring = RingBuffer::<u64>::new(1).unwrap();
        assert_eq!(ring.size(), 1);
        assert_eq!(ring.index_of(0), 0);
        assert_eq!(ring.index_of(17), 0);
    }

    #[test]
    fn test_index_masking_wraps() {
        let ring = RingBuffer::<u64>::new(8).unwrap();
        assert_eq!(ring.index_of(0), 0);
        assert_eq!(ring.index_of(7), 7);
        assert_eq!(ring.index_of(8), 0);
        assert_eq!(ring.index_of(13), 5);

        unsafe {
            *ring.get_mut(3) = 42;
            // Sequence 11 is the next lap of the same slot
            assert_eq!(*ring.get(11), 42);
        }
    }

    #[test]
    fn test_factory_fills_every_slot() {
        let mut calls = 0;
        let ring = RingBuffer::with_factory(16, || {
            calls += 1;
            vec![0u8; 4]
        }).unwrap();

        assert_eq!(calls, 16);
        for seq in 0..16 {
            assert_eq!(unsafe { ring.get(seq) }.len(), 4);
        }
    }
}
