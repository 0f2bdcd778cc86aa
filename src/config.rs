// src/config.rs
//
// Central configuration for the gridworld learner.
// This is the single source of truth for the learning rule parameters
// (epsilon, lambda, eta, gamma), the basis grid (resolution, sigma), the
// arena (reward location, reward magnitudes, step length, obstacles) and
// the per-trial step cap.
//
// Defaults reproduce the reference experiment: a 20x20 grid with sigma 0.05,
// reward at (0.8, 0.8), start at (0.1, 0.1), 10k-step cap.
//
// Sources, lowest to highest precedence: Default -> YAML file -> env -> CLI.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SARSA(λ) learning-rule parameters.
    pub learning: LearningConfig,
    /// Gaussian basis grid.
    pub basis: BasisConfig,
    /// Arena geometry and rewards.
    pub arena: ArenaConfig,
    /// Per-trial limits.
    pub trial: TrialConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Probability of picking a uniformly random action.
    pub epsilon: f64,
    /// Eligibility trace decay λ.
    pub lambda_eligibility: f64,
    /// Learning rate η.
    pub eta: f64,
    /// Reward discount γ.
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasisConfig {
    /// Number of reference points per axis (grid is `grid_size²`).
    pub grid_size: usize,
    /// Activity standard deviation σ of every Gaussian.
    pub sigma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Centre of the rewarded region.
    pub reward_position: Position,
    /// Squared arrival radius around `reward_position`; arrival is
    /// `distance² < target_radius_sq`.
    pub target_radius_sq: f64,
    /// Reward administered on arrival.
    pub reward_at_target: f64,
    /// Reward administered when a move is blocked by a wall.
    pub reward_at_wall: f64,
    /// Length of a single movement.
    pub step_length: f64,
    /// Where every trial starts.
    pub start_position: Position,
    /// Extra walls inside the unit square.
    pub obstacles: Vec<Obstacle>,
}

/// Axis-aligned rectangular wall `[x_min, x_max) × [y_min, y_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Obstacle {
    pub fn contains(&self, pos: &Position) -> bool {
        pos.x >= self.x_min && pos.x < self.x_max && pos.y >= self.y_min && pos.y < self.y_max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    /// Step cap; a trial that reaches it ends as timed out.
    pub max_steps: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.5,
            lambda_eligibility: 0.95,
            eta: 0.005,
            gamma: 0.95,
        }
    }
}

impl Default for BasisConfig {
    fn default() -> Self {
        Self {
            grid_size: 20,
            sigma: 0.05,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            reward_position: Position::new(0.8, 0.8),
            target_radius_sq: 0.01,
            reward_at_target: 10.0,
            reward_at_wall: -2.0,
            step_length: 0.03,
            start_position: Position::new(0.1, 0.1),
            obstacles: Vec::new(),
        }
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self { max_steps: 10_000 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            learning: LearningConfig::default(),
            basis: BasisConfig::default(),
            arena: ArenaConfig::default(),
            trial: TrialConfig::default(),
        }
    }
}

/// Errors that can occur when loading or validating a configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    IoError { path: String, source: String },
    ParseError { source: String },
    ValidationError { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path, source)
            }
            ConfigError::ParseError { source } => {
                write!(f, "Failed to parse config YAML: {}", source)
            }
            ConfigError::ValidationError { field, message } => {
                write!(f, "Config validation error in '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Parse a (possibly partial) YAML document; missing fields keep defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            source: e.to_string(),
        })
    }

    /// Load a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e.to_string(),
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Apply `GRIDWORLD_*` research overrides from the environment.
    ///
    /// Unparseable values are reported on stderr and ignored.
    pub fn apply_env_overrides(&mut self) {
        env_override("GRIDWORLD_EPSILON", &mut self.learning.epsilon);
        env_override("GRIDWORLD_LAMBDA", &mut self.learning.lambda_eligibility);
        env_override("GRIDWORLD_ETA", &mut self.learning.eta);
        env_override("GRIDWORLD_GAMMA", &mut self.learning.gamma);
        env_override("GRIDWORLD_SIGMA", &mut self.basis.sigma);
        env_override("GRIDWORLD_GRID_SIZE", &mut self.basis.grid_size);
        env_override("GRIDWORLD_STEP_LENGTH", &mut self.arena.step_length);
        env_override("GRIDWORLD_MAX_STEPS", &mut self.trial.max_steps);
    }

    /// Reject parameter combinations that would make learning meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.learning;
        check_unit_interval("learning.epsilon", l.epsilon)?;
        check_unit_interval("learning.lambda_eligibility", l.lambda_eligibility)?;
        check_unit_interval("learning.gamma", l.gamma)?;
        if !l.eta.is_finite() || l.eta < 0.0 {
            return Err(ConfigError::invalid(
                "learning.eta",
                format!("must be finite and >= 0, got {}", l.eta),
            ));
        }

        let b = &self.basis;
        if b.grid_size < 2 {
            return Err(ConfigError::invalid(
                "basis.grid_size",
                format!("must be >= 2, got {}", b.grid_size),
            ));
        }
        if !b.sigma.is_finite() || b.sigma <= 0.0 {
            return Err(ConfigError::invalid(
                "basis.sigma",
                format!("must be finite and > 0, got {}", b.sigma),
            ));
        }

        let a = &self.arena;
        check_inside_arena("arena.reward_position", &a.reward_position)?;
        check_inside_arena("arena.start_position", &a.start_position)?;
        if !a.target_radius_sq.is_finite() || a.target_radius_sq <= 0.0 {
            return Err(ConfigError::invalid(
                "arena.target_radius_sq",
                format!("must be finite and > 0, got {}", a.target_radius_sq),
            ));
        }
        if !a.step_length.is_finite() || a.step_length <= 0.0 {
            return Err(ConfigError::invalid(
                "arena.step_length",
                format!("must be finite and > 0, got {}", a.step_length),
            ));
        }
        if !a.reward_at_target.is_finite() {
            return Err(ConfigError::invalid("arena.reward_at_target", "must be finite"));
        }
        if !a.reward_at_wall.is_finite() {
            return Err(ConfigError::invalid("arena.reward_at_wall", "must be finite"));
        }
        for (i, o) in a.obstacles.iter().enumerate() {
            let field = format!("arena.obstacles[{}]", i);
            let bounds = [o.x_min, o.x_max, o.y_min, o.y_max];
            if bounds.iter().any(|v| !v.is_finite()) {
                return Err(ConfigError::invalid(&field, "bounds must be finite"));
            }
            if o.x_min >= o.x_max || o.y_min >= o.y_max {
                return Err(ConfigError::invalid(&field, "min bound must be below max bound"));
            }
            if o.contains(&a.start_position) {
                return Err(ConfigError::invalid(&field, "covers the start position"));
            }
        }

        if self.trial.max_steps == 0 {
            return Err(ConfigError::invalid("trial.max_steps", "must be >= 1"));
        }

        Ok(())
    }
}

/// Validate the trial/run counts of a `run` request.
pub fn validate_counts(n_trials: usize, n_runs: usize) -> Result<(), ConfigError> {
    if n_trials == 0 {
        return Err(ConfigError::invalid("n_trials", "must be >= 1"));
    }
    if n_runs == 0 {
        return Err(ConfigError::invalid("n_runs", "must be >= 1"));
    }
    Ok(())
}

fn check_unit_interval(field: &str, v: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&v) {
        return Err(ConfigError::invalid(
            field,
            format!("must lie in [0, 1], got {}", v),
        ));
    }
    Ok(())
}

fn check_inside_arena(field: &str, p: &Position) -> Result<(), ConfigError> {
    let inside = |v: f64| (0.0..1.0).contains(&v);
    if !inside(p.x) || !inside(p.y) {
        return Err(ConfigError::invalid(
            field,
            format!("must lie inside [0, 1) x [0, 1), got {}", p),
        ));
    }
    Ok(())
}

fn env_override<T: FromStr>(name: &str, slot: &mut T) {
    let Ok(raw) = std::env::var(name) else {
        return;
    };
    if raw.is_empty() {
        return;
    }
    match raw.trim().parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => eprintln!("[config] WARN: invalid {}={:?}; ignoring", name, raw),
    }
}
