//! Die sources.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::state::DIE_FACES;

/// Something that produces die values in `1..=6`.
pub trait Dice: Send + 'static {
    fn roll(&mut self) -> u8;
}

/// A fair six-sided die.
pub struct RandomDice<R = StdRng> {
    rng: R,
}

impl RandomDice<StdRng> {
    /// A die seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// A deterministic die.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send + 'static> Dice for RandomDice<R> {
    fn roll(&mut self) -> u8 {
        self.rng.random_range(1..=DIE_FACES)
    }
}

/// Replays a fixed sequence of values, then starts over.
///
/// Values outside `1..=6` are passed through untouched so callers can
/// exercise their own error paths.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    script: Vec<u8>,
    queue: VecDeque<u8>,
}

impl ScriptedDice {
    /// # Panics
    ///
    /// Panics if `script` is empty.
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        let script = script.into();
        assert!(!script.is_empty(), "a scripted die needs at least one value");
        Self {
            queue: script.iter().copied().collect(),
            script,
        }
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> u8 {
        if self.queue.is_empty() {
            self.queue.extend(self.script.iter().copied());
        }
        self.queue.pop_front().unwrap_or(1)
    }
}
