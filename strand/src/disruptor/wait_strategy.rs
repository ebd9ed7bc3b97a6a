//! Wait strategies for sequence barriers
//!
//! This module provides different wait strategies that control how a thread
//! waits for a sequence to become available. Each strategy offers different
//! trade-offs between latency, CPU usage, and throughput; they are otherwise
//! interchangeable.
//!
//! A sequence is available once the cursor and every dependent sequence have
//! reached it. All strategies re-check that condition after every wake-up and
//! poll the barrier's alert flag, so an alerted barrier releases its waiters
//! within one wait cycle.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::thread;
use std::time::{ Duration, Instant };

use parking_lot::{ Condvar, Mutex };

use crate::constants::{
    DEFAULT_MAX_SLEEP,
    DEFAULT_MIN_SLEEP,
    DEFAULT_SLEEP_RETRIES,
    DEFAULT_SPIN_TRIES,
};
use crate::disruptor::sequence::{ minimum_sequence, Sequence, SharedSequence };
use crate::error::{ Result, StrandError };

/// Trait for wait strategies that determine how a thread waits for a sequence
pub trait WaitStrategy: Send + Sync {
    /// Wait for the given sequence to be available
    ///
    /// # Arguments
    ///
    /// * `sequence` - The sequence number to wait for
    /// * `cursor` - The producer cursor
    /// * `dependents` - Upstream consumer sequences the caller must not overtake
    /// * `alert` - The barrier's alert flag; set means stop waiting
    ///
    /// # Returns
    ///
    /// The highest available sequence, which is `>= sequence`, or
    /// `StrandError::Alerted` if the alert flag was raised.
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[SharedSequence],
        alert: &AtomicBool
    ) -> Result<i64>;

    /// Wake threads parked by this strategy after new data was published
    fn signal_all_when_blocking(&self);
}

/// `min(cursor, dependents...)`
#[inline(always)]
pub(crate) fn available_sequence(cursor: &Sequence, dependents: &[SharedSequence]) -> i64 {
    minimum_sequence(dependents, cursor.get())
}

#[inline(always)]
fn check_alert(alert: &AtomicBool) -> Result<()> {
    if alert.load(Ordering::Acquire) { Err(StrandError::Alerted) } else { Ok(()) }
}

/// Busy spin wait strategy - lowest latency, highest CPU usage.
/// This strategy continuously checks for new data in a tight loop, making it
/// ideal for scenarios where latency is critical and CPU resources are abundant.
/// However, it will consume 100% of a CPU core while waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[SharedSequence],
        alert: &AtomicBool
    ) -> Result<i64> {
        loop {
            check_alert(alert)?;

            let available = available_sequence(cursor, dependents);
            if available >= sequence {
                return Ok(available);
            }

            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        // No-op for busy spin - no blocking threads to signal
    }
}

/// Yielding wait strategy - moderate CPU usage and latency.
/// Spins for `spin_tries` checks, then yields the thread between checks.
/// A good compromise between busy spinning and sleeping.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    pub fn new() -> Self {
        Self::with_spin_tries(DEFAULT_SPIN_TRIES)
    }

    pub fn with_spin_tries(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[SharedSequence],
        alert: &AtomicBool
    ) -> Result<i64> {
        let mut counter = self.spin_tries;

        loop {
            check_alert(alert)?;

            let available = available_sequence(cursor, dependents);
            if available >= sequence {
                return Ok(available);
            }

            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                std::hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Sleeping wait strategy - low CPU usage, higher latency.
/// Spins, then yields, then sleeps with an exponential backoff bounded by
/// `max_sleep`. Ideal when CPU usage is a primary concern.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    retries: u32,
    min_sleep: Duration,
    max_sleep: Duration,
}

impl SleepingWaitStrategy {
    pub fn new() -> Self {
        Self::with_backoff(DEFAULT_SLEEP_RETRIES, DEFAULT_MIN_SLEEP, DEFAULT_MAX_SLEEP)
    }

    /// `retries` checks before sleeping (the upper half spins, the lower half
    /// yields), then sleeps starting at `min_sleep`, doubling up to `max_sleep`.
    pub fn with_backoff(retries: u32, min_sleep: Duration, max_sleep: Duration) -> Self {
        Self {
            retries,
            min_sleep,
            max_sleep: max_sleep.max(min_sleep),
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[SharedSequence],
        alert: &AtomicBool
    ) -> Result<i64> {
        let spin_threshold = self.retries / 2;
        let mut counter = self.retries;
        let mut sleep = self.min_sleep;

        loop {
            check_alert(alert)?;

            let available = available_sequence(cursor, dependents);
            if available >= sequence {
                return Ok(available);
            }

            if counter > spin_threshold {
                counter -= 1;
                std::hint::spin_loop();
            } else if counter > 0 {
                counter -= 1;
                thread::yield_now();
            } else {
                thread::sleep(sleep);
                sleep = (sleep * 2).min(self.max_sleep);
            }
        }
    }

    fn signal_all_when_blocking(&self) {
        // No-op for sleeping - threads will wake up on their own
    }
}

/// Blocking wait strategy - lowest CPU usage, highest wake-up latency.
/// Parks the waiting thread on a condition variable until a producer
/// publishes or the barrier is alerted.
///
/// Once the cursor has moved far enough, dependents are spun on: they
/// are other consumers, which never signal.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condition: Condvar,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[SharedSequence],
        alert: &AtomicBool
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                check_alert(alert)?;
                self.condition.wait(&mut guard);
            }
        }

        loop {
            check_alert(alert)?;

            let available = available_sequence(cursor, dependents);
            if available >= sequence {
                return Ok(available);
            }

            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        // Taking the lock orders this notify after any waiter's condition check
        let _guard = self.mutex.lock();
        self.condition.notify_all();
    }
}

/// Timeout wait strategy - blocking wait bounded by a deadline.
/// Behaves like `BlockingWaitStrategy` but returns `StrandError::Timeout`
/// if the sequence is not available within `timeout`.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    timeout: Duration,
    mutex: Mutex<()>,
    condition: Condvar,
}

impl TimeoutBlockingWaitStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            mutex: Mutex::new(()),
            condition: Condvar::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[SharedSequence],
        alert: &AtomicBool
    ) -> Result<i64> {
        let deadline = Instant::now() + self.timeout;

        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                check_alert(alert)?;
                if self.condition.wait_until(&mut guard, deadline).timed_out() {
                    check_alert(alert)?;
                    if cursor.get() >= sequence {
                        break;
                    }
                    return Err(StrandError::Timeout);
                }
            }
        }

        loop {
            check_alert(alert)?;

            let available = available_sequence(cursor, dependents);
            if available >= sequence {
                return Ok(available);
            }
            if Instant::now() >= deadline {
                return Err(StrandError::Timeout);
            }

            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condition.notify_all();
    }
}

/// Runtime-selected wait strategy, built from `WaitStrategyType`
#[derive(Debug)]
pub enum AnyWaitStrategy {
    BusySpin(BusySpinWaitStrategy),
    Yielding(YieldingWaitStrategy),
    Sleeping(SleepingWaitStrategy),
    Blocking(BlockingWaitStrategy),
    TimeoutBlocking(TimeoutBlockingWaitStrategy),
}

impl WaitStrategy for AnyWaitStrategy {
    #[inline]
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[SharedSequence],
        alert: &AtomicBool
    ) -> Result<i64> {
        match self {
            Self::BusySpin(s) => s.wait_for(sequence, cursor, dependents, alert),
            Self::Yielding(s) => s.wait_for(sequence, cursor, dependents, alert),
            Self::Sleeping(s) => s.wait_for(sequence, cursor, dependents, alert),
            Self::Blocking(s) => s.wait_for(sequence, cursor, dependents, alert),
            Self::TimeoutBlocking(s) => s.wait_for(sequence, cursor, dependents, alert),
        }
    }

    #[inline]
    fn signal_all_when_blocking(&self) {
        match self {
            Self::BusySpin(s) => s.signal_all_when_blocking(),
            Self::Yielding(s) => s.signal_all_when_blocking(),
            Self::Sleeping(s) => s.signal_all_when_blocking(),
            Self::Blocking(s) => s.signal_all_when_blocking(),
            Self::TimeoutBlocking(s) => s.signal_all_when_blocking(),
        }
    }
}
