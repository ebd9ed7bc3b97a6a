//! # strand-test-support
//!
//! Testing infrastructure for strand.
//!
//! ## Components
//!
//! - **StressRunner** - Multi-producer runs with progress reporting and latency percentiles
//! - **SequenceChecker** - Gap / duplicate / regression detection on consumed values
//! - **Jitter** - Seeded random pauses to shake out thread interleavings

pub mod chaos;
pub mod stress;
pub mod verify;

pub use chaos::Jitter;
pub use stress::{ StressConfig, StressCounters, StressEvent, StressMetrics, StressRunner };
pub use verify::{ CheckResult, SequenceChecker };
