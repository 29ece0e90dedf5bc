//! Injected dice sources
//!
//! Dice are the engine's only nondeterministic input. Seeded games use
//! ChaCha8 so a fixed seed replays identically on every platform.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::fmt::Debug;

use crate::battle::constants::DIE_FACES;

pub trait DiceSource: Debug + Send {
    /// One d6 roll in 1..=6
    fn roll_d6(&mut self) -> u8;

    /// Uniform index in 0..n; `n` is at least 1
    fn pick(&mut self, n: usize) -> usize;

    fn roll_pool(&mut self, dice: u32) -> Vec<u8> {
        (0..dice).map(|_| self.roll_d6()).collect()
    }
}

/// Seeded pseudo-random dice
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed drawn from the OS
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl DiceSource for SeededDice {
    fn roll_d6(&mut self) -> u8 {
        self.rng.gen_range(1..=DIE_FACES)
    }

    fn pick(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n.max(1))
    }
}

/// Fixed roll sequence, for tests and replays
///
/// Once the script runs out every roll is a 1 (a miss) and every pick is 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<u8>,
    picks: VecDeque<usize>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            picks: VecDeque::new(),
        }
    }

    pub fn with_picks(mut self, picks: impl IntoIterator<Item = usize>) -> Self {
        self.picks = picks.into_iter().collect();
        self
    }

    pub fn push_rolls(&mut self, rolls: impl IntoIterator<Item = u8>) {
        self.rolls.extend(rolls);
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_d6(&mut self) -> u8 {
        self.rolls.pop_front().unwrap_or(1).clamp(1, DIE_FACES)
    }

    fn pick(&mut self, n: usize) -> usize {
        let choice = self.picks.pop_front().unwrap_or(0);
        choice.min(n.saturating_sub(1))
    }
}
