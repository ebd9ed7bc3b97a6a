//! Strand Constants
//!
//! Core constants used by sequences, sequencers and wait strategies.

use std::time::Duration;

/// Initial value of every sequence: nothing produced or consumed yet
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Cache line size for alignment (64 bytes on most CPUs)
pub const CACHE_LINE_SIZE: usize = 64;

/// Default ring buffer size (must be power of 2)
pub const DEFAULT_RING_BUFFER_SIZE: usize = 1024 * 64; // 64K slots

/// Maximum ring buffer size
pub const MAX_RING_BUFFER_SIZE: usize = 1024 * 1024 * 64; // 64M slots

/// Busy-spin iterations before the yielding strategy starts yielding
pub const DEFAULT_SPIN_TRIES: u32 = 100;

/// Retries before the sleeping strategy starts to sleep
pub const DEFAULT_SLEEP_RETRIES: u32 = 200;

/// First sleep of the sleeping strategy's backoff
pub const DEFAULT_MIN_SLEEP: Duration = Duration::from_micros(1);

/// Cap of the sleeping strategy's backoff
pub const DEFAULT_MAX_SLEEP: Duration = Duration::from_millis(1);

/// Park interval for producers gated on slow consumers, once backoff is exhausted
pub const GATING_PARK_INTERVAL: Duration = Duration::from_micros(1);
