// src/rl/policy.rs
//
// Epsilon-greedy action selection over the 8 movement directions.
//
// Design:
// - One uniform draw decides explore vs exploit.
// - Explore: uniform random action, no value queries.
// - Exploit: evaluate Q for all 8 actions at the current state and take the
//   first index of the maximum (stable argmax).
// - `act` demotes the current action to `prev_action` before storing the new
//   one; the updater credits `prev_action`, so this ordering matters.

use serde::{Deserialize, Serialize};

use crate::types::{Action, NUM_ACTIONS};

use super::matrix::ActionMatrix;
use super::random::RandomSource;
use super::step::StepContext;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    /// Probability of exploring.
    pub epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Pick an action for the state described by `features`.
    pub fn choose<R: RandomSource + ?Sized>(
        &self,
        weights: &ActionMatrix,
        features: &[f64],
        rng: &mut R,
    ) -> Action {
        if rng.uniform() < self.epsilon {
            Action::wrapping(rng.below(NUM_ACTIONS))
        } else {
            greedy_action(&weights.q_values(features))
        }
    }

    /// Choose the next action and record it in `ctx`.
    pub fn act<R: RandomSource + ?Sized>(
        &self,
        ctx: &mut StepContext,
        weights: &ActionMatrix,
        features: &[f64],
        rng: &mut R,
    ) -> Action {
        let action = self.choose(weights, features, rng);
        ctx.push_action(action);
        action
    }
}

/// First action with the maximal value. NaN values never win.
pub fn greedy_action(q: &[f64; NUM_ACTIONS]) -> Action {
    let mut best = 0;
    for a in 1..NUM_ACTIONS {
        if q[a] > q[best] || q[best].is_nan() {
            best = a;
        }
    }
    Action::wrapping(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::basis::BasisGrid;
    use crate::rl::random::ScriptedRandom;
    use crate::types::Position;

    #[test]
    fn argmax_breaks_ties_by_first_index() {
        let q = [1.0, 3.0, 2.0, 3.0, 0.0, 3.0, -1.0, 2.5];
        assert_eq!(greedy_action(&q).index(), 1);

        let flat = [0.5; NUM_ACTIONS];
        assert_eq!(greedy_action(&flat).index(), 0);
    }

    #[test]
    fn argmax_skips_nan() {
        let q = [f64::NAN, 1.0, f64::NAN, 4.0, 2.0, 0.0, 0.0, 0.0];
        assert_eq!(greedy_action(&q).index(), 3);
    }

    #[test]
    fn exploit_picks_the_highest_valued_action() {
        let grid = BasisGrid::new(4, 0.3);
        let mut w = ActionMatrix::zeros(grid.num_cells());
        let best = Action::new(6).unwrap();
        for cell in 0..grid.num_cells() {
            w.set(cell, best, 1.0);
        }
        let f = grid.features(&Position::new(0.5, 0.5));

        // 0.99 >= epsilon, so exploit.
        let mut rng = ScriptedRandom::new(vec![0.99], vec![2]);
        let policy = EpsilonGreedy::new(0.1);
        assert_eq!(policy.choose(&w, &f, &mut rng), best);
    }

    #[test]
    fn explore_uses_the_integer_draw() {
        let grid = BasisGrid::new(4, 0.3);
        let w = ActionMatrix::zeros(grid.num_cells());
        let f = grid.features(&Position::new(0.5, 0.5));

        let mut rng = ScriptedRandom::new(vec![0.05], vec![5]);
        let policy = EpsilonGreedy::new(0.1);
        assert_eq!(policy.choose(&w, &f, &mut rng).index(), 5);
    }

    #[test]
    fn epsilon_zero_never_explores_and_one_always_does() {
        let grid = BasisGrid::new(3, 0.3);
        let w = ActionMatrix::zeros(grid.num_cells());
        let f = grid.features(&Position::new(0.2, 0.2));

        let mut rng = ScriptedRandom::new(vec![0.0, 0.5, 0.999], vec![7]);
        let greedy = EpsilonGreedy::new(0.0);
        for _ in 0..3 {
            assert_eq!(greedy.choose(&w, &f, &mut rng).index(), 0);
        }

        let random = EpsilonGreedy::new(1.0);
        for _ in 0..3 {
            assert_eq!(random.choose(&w, &f, &mut rng).index(), 7);
        }
    }

    #[test]
    fn act_shifts_the_previous_action() {
        let grid = BasisGrid::new(3, 0.3);
        let w = ActionMatrix::zeros(grid.num_cells());
        let start = Position::new(0.1, 0.1);
        let f = grid.features(&start);

        let mut ctx = StepContext::start(start, Action::new(2).unwrap());
        let mut rng = ScriptedRandom::new(vec![0.0], vec![4]);
        let chosen = EpsilonGreedy::new(1.0).act(&mut ctx, &w, &f, &mut rng);

        assert_eq!(chosen.index(), 4);
        assert_eq!(ctx.action.index(), 4);
        assert_eq!(ctx.prev_action, Action::new(2));
    }
}
