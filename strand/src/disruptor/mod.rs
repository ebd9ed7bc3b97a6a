//! Sequence-coordinated ring buffer core based on the LMAX Disruptor pattern.
//!
//! ## Components
//!
//! | Piece | Type | Role |
//! |-------|------|------|
//! | Sequence | `Sequence`, `PaddedSequence` | Progress counters, one per cache line |
//! | Wait strategy | `BusySpin`, `Yielding`, `Sleeping`, `Blocking`, `TimeoutBlocking` | How a consumer waits |
//! | Barrier | `SequenceBarrier<W>` | `min(cursor, dependents)` for one consumer |
//! | Storage | `RingBuffer<T>` | Pre-allocated slots, `seq & (size - 1)` |
//! | Sequencer | `SingleProducerSequencer`, `MultiProducerSequencer` | Claim and publish |
//! | Processor | `BatchEventProcessor` | Consumer run loop |
//!
//! ## Data flow
//!
//! producer → `Sequencer::next` → write slot → `Sequencer::publish` →
//! barrier sees the cursor → processor handles `[next, available]` →
//! processor publishes its own sequence → producers and downstream barriers
//! see the progress.
//!
//! ## Safety
//!
//! Slots are accessed through `unsafe` getters. `Publisher` and
//! `BatchEventProcessor` uphold the protocol; direct users must only write
//! claimed-but-unpublished sequences and only read sequences a barrier
//! reported as available.

pub mod sequence;
pub mod wait_strategy;
pub mod barrier;
pub mod ring_buffer;
pub mod sequencer;
pub mod publisher;
pub mod processor;

pub use sequence::{ minimum_sequence, PaddedLong, PaddedSequence, Sequence, SharedSequence };
pub use wait_strategy::{
    AnyWaitStrategy,
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy,
    WaitStrategy,
    YieldingWaitStrategy,
};
pub use barrier::SequenceBarrier;
pub use ring_buffer::RingBuffer;
pub use sequencer::{ MultiProducerSequencer, Sequencer, SequencerCore, SingleProducerSequencer };
pub use publisher::Publisher;
pub use processor::{
    BatchEventProcessor,
    ErrorAction,
    EventHandler,
    EventProcessor,
    ExceptionHandler,
    FatalExceptionHandler,
    IgnoreExceptionHandler,
    ProcessorHandle,
    ProcessorState,
};

use std::time::Duration;

use crate::constants::DEFAULT_RING_BUFFER_SIZE;
use crate::error::Result;

/// Sequencer behind a `RingBufferConfig`
pub type DynSequencer = Box<dyn Sequencer<Wait = AnyWaitStrategy>>;

/// Which sequencer a ring is driven by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProducerType {
    /// Exactly one thread ever claims
    #[default]
    Single,
    /// Any number of producer threads
    Multi,
}

/// Available wait strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategyType {
    /// Busy spin for lowest latency
    BusySpin,
    /// Spin, then yield the thread
    Yielding,
    /// Spin, yield, then sleep with backoff for low CPU usage
    Sleeping,
    /// Park on a condition variable until a producer signals
    Blocking,
    /// Like `Blocking`, but report a timeout after the given duration
    TimeoutBlocking(Duration),
}

impl WaitStrategyType {
    pub fn build(self) -> AnyWaitStrategy {
        match self {
            Self::BusySpin => AnyWaitStrategy::BusySpin(BusySpinWaitStrategy::new()),
            Self::Yielding => AnyWaitStrategy::Yielding(YieldingWaitStrategy::new()),
            Self::Sleeping => AnyWaitStrategy::Sleeping(SleepingWaitStrategy::new()),
            Self::Blocking => AnyWaitStrategy::Blocking(BlockingWaitStrategy::new()),
            Self::TimeoutBlocking(timeout) =>
                AnyWaitStrategy::TimeoutBlocking(TimeoutBlockingWaitStrategy::new(timeout)),
        }
    }
}

/// Construction-time configuration for a ring and its sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingBufferConfig {
    /// Size of the ring buffer (must be power of 2)
    pub size: usize,
    pub producer_type: ProducerType,
    /// Wait strategy shared by every barrier of the sequencer
    pub wait_strategy: WaitStrategyType,
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_RING_BUFFER_SIZE,
            producer_type: ProducerType::Single,
            wait_strategy: WaitStrategyType::Blocking,
        }
    }
}

impl RingBufferConfig {
    /// Create a new configuration with the specified size
    pub fn new(size: usize) -> Result<Self> {
        ring_buffer::validate_size(size)?;

        Ok(Self {
            size,
            ..Default::default()
        })
    }

    pub fn with_producer_type(mut self, producer_type: ProducerType) -> Self {
        self.producer_type = producer_type;
        self
    }

    pub fn with_wait_strategy(mut self, strategy: WaitStrategyType) -> Self {
        self.wait_strategy = strategy;
        self
    }

    /// Build the configured sequencer.
    ///
    /// A multi-producer sequencer can be shared between threads by building
    /// `MultiProducerSequencer` directly and cloning it; the boxed form here
    /// serves one producer thread.
    pub fn build_sequencer(&self) -> Result<DynSequencer> {
        let strategy = self.wait_strategy.build();
        let sequencer: DynSequencer = match self.producer_type {
            ProducerType::Single => Box::new(SingleProducerSequencer::new(self.size, strategy)?),
            ProducerType::Multi => Box::new(MultiProducerSequencer::new(self.size, strategy)?),
        };

        tracing::debug!(
            size = self.size,
            producer_type = ?self.producer_type,
            wait_strategy = ?self.wait_strategy,
            "sequencer built"
        );
        Ok(sequencer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_config_creation() {
        let config = RingBufferConfig::new(1024).unwrap();
        assert_eq!(config.size, 1024);
        assert_eq!(config.producer_type, ProducerType::Single);
        assert_eq!(config.wait_strategy, WaitStrategyType::Blocking);
    }

    #[test]
    fn test_ring_buffer_config_invalid_size() {
        assert!(RingBufferConfig::new(0).is_err());
        assert!(RingBufferConfig::new(1023).is_err()); // Not power of 2
    }

    #[test]
    fn test_ring_buffer_config_builder() {
        let config = RingBufferConfig::new(16)
            .unwrap()
            .with_producer_type(ProducerType::Multi)
            .with_wait_strategy(WaitStrategyType::TimeoutBlocking(Duration::from_millis(5)));

        assert_eq!(config.producer_type, ProducerType::Multi);
        assert!(matches!(config.wait_strategy.build(), AnyWaitStrategy::TimeoutBlocking(_)));
    }

    #[test]
    fn test_build_sequencer_from_config() {
        for producer_type in [ProducerType::Single, ProducerType::Multi] {
            let config = RingBufferConfig::new(8)
                .unwrap()
                .with_producer_type(producer_type)
                .with_wait_strategy(WaitStrategyType::Yielding);

            let mut sequencer = config.build_sequencer().unwrap();
            let ring = RingBuffer::<u32>::from_config(&config).unwrap();
            assert_eq!(sequencer.buffer_size(), ring.size());

            let high = sequencer.next(3);
            sequencer.publish_range(0, high);
            assert_eq!(sequencer.cursor().get(), 2);

            let barrier = sequencer.new_barrier(&[]);
            assert_eq!(barrier.wait_for(0).unwrap(), 2);
        }
    }
}
