//! Injectable randomness for reply delays and line choice

use super::script::DelayWindow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Source of the "typing" jitter.
///
/// The transition function only ever asks for randomness through this trait,
/// so tests can pin delays and choices.
pub trait Jitter {
    /// A delay inside `window` (inclusive on both ends)
    fn delay_in(&mut self, window: DelayWindow) -> Duration;

    /// An index in `0..len`; callers never pass `len == 0`
    fn pick(&mut self, len: usize) -> usize;
}

/// Jitter backed by a `rand` generator
#[derive(Debug, Clone)]
pub struct RandomJitter<R> {
    rng: R,
}

impl<R: Rng> RandomJitter<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomJitter<StdRng> {
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible jitter for tests and replays
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Jitter for RandomJitter<R> {
    fn delay_in(&mut self, window: DelayWindow) -> Duration {
        let max = window.max_ms.max(window.min_ms);
        Duration::from_millis(self.rng.gen_range(window.min_ms..=max))
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Deterministic jitter: always the low end of the window, choices in rotation
#[derive(Debug, Clone, Default)]
pub struct FixedJitter {
    next_pick: usize,
}

impl FixedJitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Jitter for FixedJitter {
    fn delay_in(&mut self, window: DelayWindow) -> Duration {
        window.min()
    }

    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let picked = self.next_pick % len;
        self.next_pick = self.next_pick.wrapping_add(1);
        picked
    }
}
