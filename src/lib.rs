//! Gridworld core library.
//!
//! SARSA(λ) with a Gaussian basis-function approximator, learning to
//! navigate from a start point to a rewarded disc in the continuous unit
//! square. The binary (`src/main.rs`) is a thin experiment harness around
//! these components.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod rl;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use config::{validate_counts, Config, ConfigError, Obstacle};

pub use logging::{telemetry_from_env, EventSink, FileSink, NoopSink, TrajectoryRecorder};

pub use metrics::{learning_curve, quartile_means, LatencyStats, QuartileMeans};

pub use rl::{
    Agent, Arena, BasisGrid, EpsilonGreedy, Experiment, ExperimentConfig, ExperimentReport,
    RandomSource, RunOutcome, SarsaLearner, StepContext, TerminationReason, TrialPhase,
    TrialSummary,
};

pub use types::{Action, Position, NUM_ACTIONS};
