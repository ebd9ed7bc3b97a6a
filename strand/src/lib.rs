//! # strand
//!
//! Lock-free inter-thread messaging on a pre-allocated ring, coordinated by
//! atomic sequence counters instead of locks or queues.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::thread;
//! use strand::disruptor::{
//!     BatchEventProcessor, EventProcessor, Publisher, RingBuffer, Sequencer,
//!     SingleProducerSequencer, YieldingWaitStrategy,
//! };
//!
//! let ring = Arc::new(RingBuffer::<u64>::new(1024).unwrap());
//! let sequencer = SingleProducerSequencer::new(1024, YieldingWaitStrategy::new()).unwrap();
//!
//! let handler = |value: &u64, seq: i64, _end: bool| {
//!     println!("{}: {}", seq, value);
//!     anyhow::Ok(())
//! };
//! let mut consumer = BatchEventProcessor::new(ring.clone(), sequencer.new_barrier(&[]), handler);
//! sequencer.add_gating_sequences(&[consumer.sequence()]);
//! let handle = consumer.handle();
//! let worker = thread::spawn(move || consumer.run());
//!
//! let mut publisher = Publisher::new(ring, sequencer).unwrap();
//! publisher.publish_event(|slot, seq| *slot = seq as u64 * 2);
//!
//! handle.halt();
//! worker.join().unwrap().unwrap();
//! ```
//!
//! ## Modules
//!
//! - `disruptor` - sequences, wait strategies, barriers, ring, sequencers, processors
//! - `error` - `StrandError` and `Result`
//! - `metrics` - process-wide counters (`METRICS`); per-event counts need the `metrics` feature
//! - `insights` - `tracing` subscriber setup

pub mod constants;
pub mod disruptor;
pub mod error;
pub mod insights;
pub mod metrics;

pub use error::{ Result, StrandError };
pub use insights::init_tracing;
pub use metrics::{ MetricsSnapshot, METRICS };
