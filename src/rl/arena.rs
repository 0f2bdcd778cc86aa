// src/rl/arena.rs
//
// Transition model and reward function for the continuous arena.
//
// - Moves have fixed length `step_length` along the chosen heading.
// - Moves that would end outside [0,1) x [0,1), or inside an obstacle, are
//   rejected: the agent stays put and `wall_touched` is raised.
// - Arrival is the open disc `distance² < target_radius_sq` around the
//   reward position.
// - The reward reads the state left by the last transition (position and
//   wall flag); it is not an independent predicate.

use crate::config::{ArenaConfig, Obstacle};
use crate::types::Position;

use super::step::StepContext;

#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    reward_position: Position,
    target_radius_sq: f64,
    reward_at_target: f64,
    reward_at_wall: f64,
    step_length: f64,
    start_position: Position,
    obstacles: Vec<Obstacle>,
}

impl Arena {
    pub fn from_config(cfg: &ArenaConfig) -> Self {
        Self {
            reward_position: cfg.reward_position,
            target_radius_sq: cfg.target_radius_sq,
            reward_at_target: cfg.reward_at_target,
            reward_at_wall: cfg.reward_at_wall,
            step_length: cfg.step_length,
            start_position: cfg.start_position,
            obstacles: cfg.obstacles.clone(),
        }
    }

    pub fn start_position(&self) -> Position {
        self.start_position
    }

    /// True outside the unit square or inside any obstacle.
    pub fn is_wall(&self, pos: &Position) -> bool {
        // Written so that NaN coordinates also count as walls.
        let inside = |v: f64| (0.0..1.0).contains(&v);
        if !inside(pos.x) || !inside(pos.y) {
            return true;
        }
        self.obstacles.iter().any(|o| o.contains(pos))
    }

    /// True when the squared distance to the reward position is strictly
    /// below `target_radius_sq`.
    pub fn arrived(&self, pos: &Position) -> bool {
        pos.distance_sq(&self.reward_position) < self.target_radius_sq
    }

    /// Apply `ctx.action` to `ctx.state`.
    pub fn transition(&self, ctx: &mut StepContext) {
        ctx.prev_state = ctx.state;

        let candidate = ctx.state.moved(ctx.action, self.step_length);
        if self.is_wall(&candidate) {
            ctx.state = ctx.prev_state;
            ctx.wall_touched = true;
        } else {
            ctx.state = candidate;
            ctx.wall_touched = false;
        }
    }

    /// Reward for the transition that produced `ctx`.
    pub fn reward(&self, ctx: &StepContext) -> f64 {
        if self.arrived(&ctx.state) {
            return self.reward_at_target;
        }
        if ctx.wall_touched {
            self.reward_at_wall
        } else {
            0.0
        }
    }
}
