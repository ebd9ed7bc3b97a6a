//! Randomised pauses for widening race windows in tests.
//!
//! Seeded so a failing interleaving can be replayed.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{ Rng, SeedableRng };

/// Injects occasional yields and short sleeps into a thread's loop
#[derive(Debug, Clone)]
pub struct Jitter {
    rng: StdRng,
    probability: f64,
    max_delay: Duration,
    pauses: u64,
}

impl Jitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            probability: 0.01,
            max_delay: Duration::from_micros(50),
            pauses: 0,
        }
    }

    /// Chance (0.0..=1.0) that `pause` actually pauses
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Maybe yield or sleep; returns whether it paused
    pub fn pause(&mut self) -> bool {
        if !self.rng.gen_bool(self.probability) {
            return false;
        }
        self.pauses += 1;

        let max_nanos = self.max_delay.as_nanos() as u64;
        if max_nanos == 0 || self.rng.gen_bool(0.5) {
            thread::yield_now();
        } else {
            thread::sleep(Duration::from_nanos(self.rng.gen_range(1..=max_nanos)));
        }
        true
    }

    /// How many times `pause` paused so far
    pub fn pauses(&self) -> u64 {
        self.pauses
    }
}
