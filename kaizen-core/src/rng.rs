//! Deterministic randomness for null (coin-flip direction) mode.
//!
//! Sweep instances derive their seeds from a master seed by BLAKE3 hashing of
//! `(master, label, iteration)`, so a seed never depends on which worker thread
//! picked the instance up.

use crate::domain::Direction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Order-independent sub-seed for one labelled instance.
    pub fn sub_seed(&self, label: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(label.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }
}

/// Fair coin over trade direction, one draw per emitted signal.
#[derive(Debug, Clone)]
pub struct DirectionSampler {
    seed: u64,
    rng: StdRng,
}

impl DirectionSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn draw(&mut self) -> Direction {
        if self.rng.gen_bool(0.5) {
            Direction::Long
        } else {
            Direction::Short
        }
    }
}
