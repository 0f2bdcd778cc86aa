// src/rl/sarsa.rs
//
// SARSA(λ) weight update over the linear basis-function approximator.
//
// Per step, given (prev_state, prev_action) -> (state, action) and the
// reward of that transition:
//
//   δ = r − (Q(prev_state, prev_action) − γ·Q(state, action))
//   e ← λ·γ·e
//   e[:, prev_action] += φ(prev_state)
//   w ← w + η·δ·e
//
// δ is kept in exactly this arithmetic form. The update is a pure function
// of (w, e) and its inputs: cloned learners fed the same step stay
// bit-identical.

use serde::{Deserialize, Serialize};

use crate::config::LearningConfig;
use crate::types::Action;

use super::basis::BasisGrid;
use super::matrix::ActionMatrix;
use super::random::RandomSource;
use super::step::StepContext;
use super::trace::EligibilityTrace;

/// Learning-rule constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SarsaParams {
    /// Trace decay λ.
    pub lambda: f64,
    /// Discount γ.
    pub gamma: f64,
    /// Learning rate η.
    pub eta: f64,
}

impl SarsaParams {
    pub fn from_config(cfg: &LearningConfig) -> Self {
        Self {
            lambda: cfg.lambda_eligibility,
            gamma: cfg.gamma,
            eta: cfg.eta,
        }
    }
}

/// Weights + eligibility trace of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SarsaLearner {
    params: SarsaParams,
    grid: BasisGrid,
    weights: ActionMatrix,
    trace: EligibilityTrace,
}

impl SarsaLearner {
    /// Random weights in `[0, 1)`, zero trace.
    pub fn new<R: RandomSource + ?Sized>(params: SarsaParams, grid: BasisGrid, rng: &mut R) -> Self {
        let cells = grid.num_cells();
        Self {
            params,
            weights: ActionMatrix::random(cells, rng),
            trace: EligibilityTrace::new(cells),
            grid,
        }
    }

    /// Fresh random weights and a cleared trace.
    pub fn reset<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        self.weights = ActionMatrix::random(self.grid.num_cells(), rng);
        self.trace.reset();
    }

    pub fn params(&self) -> SarsaParams {
        self.params
    }

    pub fn grid(&self) -> &BasisGrid {
        &self.grid
    }

    pub fn weights(&self) -> &ActionMatrix {
        &self.weights
    }

    pub fn trace(&self) -> &EligibilityTrace {
        &self.trace
    }

    /// Current estimate of Q(features, action).
    pub fn q_value(&self, features: &[f64], action: Action) -> f64 {
        self.weights.q_value(features, action)
    }

    /// δ for one transition, using the current weights.
    pub fn td_error(
        &self,
        reward: f64,
        prev_features: &[f64],
        prev_action: Action,
        features: &[f64],
        action: Action,
    ) -> f64 {
        reward
            - (self.q_value(prev_features, prev_action)
                - self.params.gamma * self.q_value(features, action))
    }

    /// Apply one SARSA(λ) step, computing the basis activations of both
    /// states. Returns δ, or `None` when `ctx` has no previous action.
    pub fn update(&mut self, ctx: &StepContext, reward: f64) -> Option<f64> {
        let prev_features = self.grid.features(&ctx.prev_state);
        let features = self.grid.features(&ctx.state);
        self.update_with_features(ctx, reward, &prev_features, &features)
    }

    /// Same as [`SarsaLearner::update`] with caller-supplied activations of
    /// `ctx.prev_state` and `ctx.state`.
    pub fn update_with_features(
        &mut self,
        ctx: &StepContext,
        reward: f64,
        prev_features: &[f64],
        features: &[f64],
    ) -> Option<f64> {
        let prev_action = ctx.prev_action?;

        let delta = self.td_error(reward, prev_features, prev_action, features, ctx.action);

        self.trace.decay(self.params.lambda * self.params.gamma);
        self.trace.accumulate(prev_action, prev_features);

        self.weights
            .add_scaled(self.params.eta * delta, self.trace.matrix());

        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::random::seeded_rng;
    use crate::types::Position;

    fn act(i: usize) -> Action {
        Action::new(i).unwrap()
    }

    fn learner() -> SarsaLearner {
        let params = SarsaParams {
            lambda: 0.95,
            gamma: 0.95,
            eta: 0.005,
        };
        SarsaLearner::new(params, BasisGrid::new(20, 0.05), &mut seeded_rng(11))
    }

    fn step_ctx() -> StepContext {
        StepContext {
            prev_state: Position::new(0.40, 0.40),
            prev_action: Some(act(1)),
            state: Position::new(0.40 + 0.03 / 2f64.sqrt(), 0.40 + 0.03 / 2f64.sqrt()),
            action: act(3),
            wall_touched: false,
        }
    }

    #[test]
    fn td_error_uses_the_literal_form() {
        let l = learner();
        let ctx = step_ctx();
        let g = l.grid();
        let fp = g.features(&ctx.prev_state);
        let f = g.features(&ctx.state);

        let q_old = l.q_value(&fp, act(1));
        let q_new = l.q_value(&f, act(3));
        let expected = 1.5 - (q_old - 0.95 * q_new);

        let delta = l.td_error(1.5, &fp, act(1), &f, act(3));
        assert_eq!(delta.to_bits(), expected.to_bits());
    }

    #[test]
    fn first_update_credits_only_the_previous_action() {
        let mut l = learner();
        let before = l.weights().clone();
        let ctx = step_ctx();

        let delta = l.update(&ctx, 0.0).expect("previous action is set");

        let fp = l.grid().features(&ctx.prev_state);
        for cell in 0..l.grid().num_cells() {
            for a in Action::all() {
                let e = l.trace().get(cell, a);
                if a == act(1) {
                    assert_eq!(e, fp[cell]);
                    let expected_w = before.get(cell, a) + 0.005 * delta * fp[cell];
                    assert!((l.weights().get(cell, a) - expected_w).abs() < 1e-15);
                } else {
                    assert_eq!(e, 0.0);
                    assert_eq!(l.weights().get(cell, a), before.get(cell, a));
                }
            }
        }
    }

    #[test]
    fn trace_decays_by_lambda_gamma() {
        let mut l = learner();
        let ctx = step_ctx();
        l.update(&ctx, 0.0);
        let cell = l.grid().cell_index(8, 8);
        let first = l.trace().get(cell, act(1));

        // Second step credits a different action; act(1)'s column only decays.
        let mut next = ctx;
        next.push_action(act(5));
        l.update(&next, 0.0);
        let decayed = l.trace().get(cell, act(1));
        assert!((decayed - first * 0.95 * 0.95).abs() < 1e-15);
    }

    #[test]
    fn no_previous_action_is_a_noop() {
        let mut l = learner();
        let before = l.clone();
        let ctx = StepContext::start(Position::new(0.1, 0.1), act(0));
        assert_eq!(l.update(&ctx, 10.0), None);
        assert_eq!(l, before);
    }

    #[test]
    fn update_is_bitwise_deterministic() {
        let base = learner();
        let mut a = base.clone();
        let mut b = base.clone();
        let ctx = step_ctx();

        for reward in [0.0, -2.0, 10.0] {
            let da = a.update(&ctx, reward);
            let db = b.update(&ctx, reward);
            assert_eq!(da.map(f64::to_bits), db.map(f64::to_bits));
        }

        let bits = |m: &ActionMatrix| m.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(a.weights()), bits(b.weights()));
        assert_eq!(bits(a.trace().matrix()), bits(b.trace().matrix()));
    }

    #[test]
    fn positive_surprise_raises_the_credited_value() {
        let mut l = learner();
        let ctx = step_ctx();
        let fp = l.grid().features(&ctx.prev_state);
        let q_before = l.q_value(&fp, act(1));

        let delta = l.update(&ctx, 10.0).unwrap();
        assert!(delta > 0.0);
        assert!(l.q_value(&fp, act(1)) > q_before);
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut l = learner();
        l.update(&step_ctx(), 10.0);
        assert!(!l.trace().is_zero());

        l.reset(&mut seeded_rng(5));
        assert!(l.trace().is_zero());
        assert!(l.weights().as_slice().iter().all(|v| (0.0..1.0).contains(v)));
    }
}
