// src/rl/mod.rs
//
// SARSA(λ) navigation learner.
//
// Key components:
// - BasisGrid: Gaussian place-cell activations over the unit square
// - ActionMatrix: (cells x 8) weights, Q(s, a) = Σ w[cell, a]·φ_cell(s)
// - EligibilityTrace: decaying credit for recent (cell, action) pairs
// - EpsilonGreedy: action selection
// - Arena: transition model, walls, rewards
// - SarsaLearner: TD error + trace + weight update
// - Agent: trial/run controller
// - Experiment: seeded multi-run driver, optionally threaded
// - RandomSource: injected randomness (ChaCha8 by default)

pub mod arena;
pub mod basis;
pub mod experiment;
pub mod matrix;
pub mod policy;
pub mod random;
pub mod runner;
pub mod sarsa;
pub mod step;
pub mod trace;

// Re-exports for convenience
pub use arena::Arena;
pub use basis::BasisGrid;
pub use experiment::{Experiment, ExperimentConfig, ExperimentReport, RunOutcome, TrialStats};
pub use matrix::ActionMatrix;
pub use policy::{greedy_action, EpsilonGreedy};
pub use random::{run_seed, seeded_rng, RandomSource, ScriptedRandom};
pub use runner::{Agent, TerminationReason, TrialPhase, TrialSummary};
pub use sarsa::{SarsaLearner, SarsaParams};
pub use step::StepContext;
pub use trace::EligibilityTrace;
