//! Random sources for order splitting.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Supplies random draws to the stealth splitter.
pub trait RandomSource: Send + Sync {
    /// Uniform draw from `low..=high`.
    fn range_inclusive(&self, low: u64, high: u64) -> u64;
}

/// Thread-local RNG drawn fresh on every call; no state is shared between
/// concurrent splits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn range_inclusive(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Deterministic RNG from a fixed seed, for tests and replays.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn range_inclusive(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(low..=high)
    }
}
