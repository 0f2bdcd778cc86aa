// src/rl/step.rs
//
// One-step bookkeeping shared by the policy, the arena and the updater.
//
// `(prev_state, prev_action)` is always the pair one step before
// `(state, action)`:
// - `Arena::transition` shifts `state` into `prev_state` before moving,
// - `StepContext::push_action` shifts `action` into `prev_action` before
//   storing the newly chosen action.

use serde::{Deserialize, Serialize};

use crate::types::{Action, Position};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepContext {
    pub prev_state: Position,
    /// `None` until a second action has been chosen in this context.
    pub prev_action: Option<Action>,
    pub state: Position,
    pub action: Action,
    /// Set by the most recent transition when the move was blocked.
    pub wall_touched: bool,
}

impl StepContext {
    /// Context at the start of a trial: the first action has been chosen,
    /// nothing has moved yet.
    pub fn start(state: Position, action: Action) -> Self {
        Self {
            prev_state: state,
            prev_action: None,
            state,
            action,
            wall_touched: false,
        }
    }

    /// Store a newly chosen action, demoting the current one.
    pub fn push_action(&mut self, action: Action) {
        self.prev_action = Some(self.action);
        self.action = action;
    }
}
