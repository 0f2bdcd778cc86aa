// src/rl/random.rs
//
// Injected randomness for the learner.
//
// The learner only ever needs two kinds of draws: a uniform float in [0, 1)
// (weight initialisation, the epsilon coin) and a uniform integer below n
// (exploratory actions). Everything goes through `RandomSource` so runs are
// reproducible from a single u64 seed and tests can script the draws.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of the uniform draws consumed by the learner.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Uniform integer in `[0, n)`. `n` must be non-zero.
    fn below(&mut self, n: usize) -> usize;
}

impl RandomSource for ChaCha8Rng {
    fn uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn below(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }

    fn below(&mut self, n: usize) -> usize {
        (**self).below(n)
    }
}

/// Default deterministic generator for a run.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Seed used for run `run_index` of an experiment based at `base_seed`.
pub fn run_seed(base_seed: u64, run_index: usize) -> u64 {
    base_seed.wrapping_add(run_index as u64)
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// Useful to force a particular branch of the policy in tests and
/// deterministic replays.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    uniforms: Vec<f64>,
    integers: Vec<usize>,
    next_uniform: usize,
    next_integer: usize,
}

impl ScriptedRandom {
    pub fn new(uniforms: Vec<f64>, integers: Vec<usize>) -> Self {
        Self {
            uniforms,
            integers,
            next_uniform: 0,
            next_integer: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        if self.uniforms.is_empty() {
            return 0.0;
        }
        let v = self.uniforms[self.next_uniform % self.uniforms.len()];
        self.next_uniform += 1;
        v
    }

    fn below(&mut self, n: usize) -> usize {
        if self.integers.is_empty() {
            return 0;
        }
        let v = self.integers[self.next_integer % self.integers.len()];
        self.next_integer += 1;
        v % n
    }
}
