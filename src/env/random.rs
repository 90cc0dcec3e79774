//! Randomness used for session codes and board layouts.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform integer source.
///
/// Implementations must return values in `0..bound` with equal probability.
/// `bound` is never zero when called from this crate.
pub trait RandomSource: Send + Sync {
    fn next_below(&self, bound: usize) -> usize;
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_below(&self, bound: usize) -> usize {
        rand::rng().random_range(0..bound)
    }
}

/// Reproducible generator for tests and replays.
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
    fn next_below(&self, bound: usize) -> usize {
        self.rng.lock().random_range(0..bound)
    }
}

/// Fisher–Yates shuffle driven by `random`.
pub fn shuffle<T>(random: &dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = random.next_below(i + 1);
        items.swap(i, j);
    }
}
