// src/rl/runner.rs
//
// Trial / run controller.
//
// A trial walks the state machine
//
//   AwaitingFirstAction -> Stepping -> Arrived | TimedOut
//
// - AwaitingFirstAction: position back at the start point, first action
//   chosen, no weight update.
// - Stepping: transition, choose next action, update; one step per
//   iteration until arrival or the step cap.
//
// Weights and trace persist across the trials of a run; `reset` starts a
// new run (fresh random weights, zero trace, empty latency list).

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{validate_counts, Config, ConfigError};
use crate::logging::{EventSink, NoopSink};
use crate::types::{Action, Position};

use super::arena::Arena;
use super::basis::BasisGrid;
use super::experiment::RunOutcome;
use super::matrix::ActionMatrix;
use super::policy::EpsilonGreedy;
use super::random::{seeded_rng, RandomSource};
use super::sarsa::{SarsaLearner, SarsaParams};
use super::step::StepContext;
use super::trace::EligibilityTrace;

/// Where the controller is within the current trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialPhase {
    AwaitingFirstAction,
    Stepping,
    Arrived,
    TimedOut,
}

/// Why a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Reached the target region.
    Arrived,
    /// Hit the step cap.
    TimedOut,
}

/// Outcome of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    /// Run the trial belongs to.
    pub run: usize,
    /// Trial index within the run.
    pub trial: usize,
    /// Steps taken (the step cap on timeout).
    pub latency: u64,
    pub termination: TerminationReason,
    /// Number of blocked moves.
    pub wall_touches: u64,
    /// Sum of step rewards.
    pub total_reward: f64,
}

/// SARSA(λ) agent in the continuous arena.
pub struct Agent<R: RandomSource = ChaCha8Rng> {
    config: Config,
    arena: Arena,
    policy: EpsilonGreedy,
    learner: SarsaLearner,
    rng: R,
    ctx: StepContext,
    phase: TrialPhase,
    latency_list: Vec<u64>,
    run_index: usize,
}

impl Agent<ChaCha8Rng> {
    /// Validated agent driven by a `ChaCha8Rng` seeded with `seed`.
    pub fn new(config: Config, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, seeded_rng(seed))
    }

    /// Agent that accepts any configuration as given.
    pub fn new_unvalidated(config: Config, seed: u64) -> Self {
        Self::build(config, seeded_rng(seed))
    }
}

impl<R: RandomSource> Agent<R> {
    /// Validated agent using an injected random source.
    pub fn with_rng(config: Config, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, rng))
    }

    pub(crate) fn build(config: Config, mut rng: R) -> Self {
        let grid = BasisGrid::from_config(&config.basis);
        let params = SarsaParams::from_config(&config.learning);
        let learner = SarsaLearner::new(params, grid, &mut rng);
        let arena = Arena::from_config(&config.arena);
        let start = arena.start_position();

        Self {
            policy: EpsilonGreedy::new(config.learning.epsilon),
            arena,
            learner,
            rng,
            ctx: StepContext::start(start, Action::wrapping(0)),
            phase: TrialPhase::AwaitingFirstAction,
            latency_list: Vec::new(),
            run_index: 0,
            config,
        }
    }

    /// Fresh random weights, zero trace, empty latency list, back at the
    /// start position with no remembered action.
    pub fn reset(&mut self) {
        self.learner.reset(&mut self.rng);
        self.latency_list.clear();
        self.ctx = StepContext::start(self.arena.start_position(), Action::wrapping(0));
        self.phase = TrialPhase::AwaitingFirstAction;
    }

    /// Swap the random source, keeping weights and history.
    pub fn replace_rng(&mut self, rng: R) -> R {
        std::mem::replace(&mut self.rng, rng)
    }

    /// Label attached to subsequent trial summaries.
    pub fn set_run_index(&mut self, run_index: usize) {
        self.run_index = run_index;
    }

    /// Run one trial from the start position, learning as it goes.
    pub fn run_trial<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> TrialSummary {
        let trial = self.latency_list.len();
        let max_steps = self.config.trial.max_steps;
        let start = self.arena.start_position();

        self.phase = TrialPhase::AwaitingFirstAction;
        let mut features = self.learner.grid().features(&start);
        let first = self
            .policy
            .choose(self.learner.weights(), &features, &mut self.rng);
        self.ctx = StepContext::start(start, first);
        self.phase = TrialPhase::Stepping;

        let mut next_features = vec![0.0; features.len()];
        let mut steps: u64 = 0;
        let mut wall_touches: u64 = 0;
        let mut total_reward = 0.0;

        let termination = loop {
            if self.arena.arrived(&self.ctx.state) {
                self.phase = TrialPhase::Arrived;
                break TerminationReason::Arrived;
            }
            if steps >= max_steps {
                self.phase = TrialPhase::TimedOut;
                break TerminationReason::TimedOut;
            }

            self.arena.transition(&mut self.ctx);
            let reward = self.arena.reward(&self.ctx);

            self.learner
                .grid()
                .features_into(&self.ctx.state, &mut next_features);
            self.policy.act(
                &mut self.ctx,
                self.learner.weights(),
                &next_features,
                &mut self.rng,
            );
            self.learner
                .update_with_features(&self.ctx, reward, &features, &next_features);
            std::mem::swap(&mut features, &mut next_features);

            steps += 1;
            total_reward += reward;
            if self.ctx.wall_touched {
                wall_touches += 1;
            }
            sink.on_step(trial, steps, &self.ctx, reward);
        };

        self.latency_list.push(steps);

        let summary = TrialSummary {
            run: self.run_index,
            trial,
            latency: steps,
            termination,
            wall_touches,
            total_reward,
        };
        sink.on_trial_end(&summary);
        summary
    }

    /// Run `n_trials` more trials without resetting; returns their latencies.
    pub fn learn_run<S: EventSink + ?Sized>(&mut self, n_trials: usize, sink: &mut S) -> Vec<u64> {
        let first = self.latency_list.len();
        for _ in 0..n_trials {
            self.run_trial(sink);
        }
        self.latency_list[first..].to_vec()
    }

    /// Reset, then run `n_trials` trials labelled as run `run_index`.
    pub(crate) fn run_fresh<S: EventSink + ?Sized>(
        &mut self,
        run_index: usize,
        n_trials: usize,
        sink: &mut S,
    ) -> Vec<u64> {
        self.set_run_index(run_index);
        self.reset();
        self.learn_run(n_trials, sink)
    }

    /// Averaged latency series over `n_runs` independent runs.
    ///
    /// Leaves the weights, trace and latency list of the last run in place.
    pub fn run(&mut self, n_trials: usize, n_runs: usize) -> Result<Vec<f64>, ConfigError> {
        self.run_with_sink(n_trials, n_runs, &mut NoopSink)
    }

    pub fn run_with_sink<S: EventSink + ?Sized>(
        &mut self,
        n_trials: usize,
        n_runs: usize,
        sink: &mut S,
    ) -> Result<Vec<f64>, ConfigError> {
        validate_counts(n_trials, n_runs)?;

        let mut averaged = vec![0.0; n_trials];
        for run in 0..n_runs {
            let latencies = self.run_fresh(run, n_trials, sink);
            for (acc, l) in averaged.iter_mut().zip(&latencies) {
                *acc += *l as f64 / n_runs as f64;
            }
            sink.on_run_end(&RunOutcome {
                run_index: run,
                seed: None,
                latencies,
            });
        }
        Ok(averaged)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn weights(&self) -> &ActionMatrix {
        self.learner.weights()
    }

    pub fn trace(&self) -> &EligibilityTrace {
        self.learner.trace()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn position(&self) -> Position {
        self.ctx.state
    }

    pub fn step_context(&self) -> &StepContext {
        &self.ctx
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    /// Latencies of the current run, in trial order.
    pub fn latency_list(&self) -> &[u64] {
        &self.latency_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::TrajectoryRecorder;
    use crate::rl::random::ScriptedRandom;

    fn quick_config() -> Config {
        let mut cfg = Config::default();
        cfg.trial.max_steps = 300;
        cfg
    }

    #[test]
    fn construction_matches_a_fresh_run() {
        let agent = Agent::new(Config::default(), 1).unwrap();
        assert_eq!(agent.weights().shape(), (400, 8));
        assert!(agent.trace().is_zero());
        assert_eq!(agent.position(), Position::new(0.1, 0.1));
        assert_eq!(agent.step_context().prev_action, None);
        assert_eq!(agent.phase(), TrialPhase::AwaitingFirstAction);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = Config::default();
        cfg.basis.sigma = 0.0;
        match Agent::new(cfg.clone(), 1) {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "basis.sigma"),
            other => panic!("expected validation error, got {:?}", other.err()),
        }
        // The unvalidated constructor accepts it.
        let _ = Agent::new_unvalidated(cfg, 1);
    }

    #[test]
    fn run_rejects_zero_counts() {
        let mut agent = Agent::new(quick_config(), 1).unwrap();
        assert!(matches!(
            agent.run(0, 1),
            Err(ConfigError::ValidationError { .. })
        ));
        assert!(matches!(
            agent.run(1, 0),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn trial_summary_is_consistent() {
        let mut agent = Agent::new(quick_config(), 3).unwrap();
        let mut rec = TrajectoryRecorder::new();
        let summary = agent.run_trial(&mut rec);

        assert_eq!(summary.trial, 0);
        assert_eq!(agent.latency_list(), &[summary.latency]);
        assert!(summary.latency >= 1 && summary.latency <= 300);
        assert!(summary.wall_touches <= summary.latency);
        match summary.termination {
            TerminationReason::Arrived => {
                assert_eq!(agent.phase(), TrialPhase::Arrived);
                assert!(agent.arena().arrived(&agent.position()));
                assert_eq!(
                    summary.total_reward,
                    10.0 - 2.0 * summary.wall_touches as f64
                );
            }
            TerminationReason::TimedOut => {
                assert_eq!(agent.phase(), TrialPhase::TimedOut);
                assert_eq!(summary.latency, 300);
                assert_eq!(summary.total_reward, -2.0 * summary.wall_touches as f64);
            }
        }
        assert_eq!(rec.last_trajectory().len() as u64, summary.latency + 1);
        assert_eq!(rec.last_trajectory()[0], Position::new(0.1, 0.1));
    }

    #[test]
    fn scripted_walk_reaches_the_target() {
        // Always explore, always pick action 1 (north-east).
        let rng = ScriptedRandom::new(vec![0.0], vec![1]);
        let mut cfg = Config::default();
        cfg.learning.epsilon = 1.0;
        let mut agent = Agent::with_rng(cfg, rng).unwrap();

        let summary = agent.run_trial(&mut NoopSink);
        assert_eq!(summary.termination, TerminationReason::Arrived);
        // From (0.1, 0.1) along the diagonal: distance to (0.8, 0.8) drops
        // below 0.1 once 0.03·k > 0.7·√2 − 0.1, i.e. k = 30.
        assert_eq!(summary.latency, 30);
        assert_eq!(summary.wall_touches, 0);
        assert_eq!(summary.total_reward, 10.0);
    }

    #[test]
    fn learn_run_continues_and_reset_forgets() {
        let mut agent = Agent::new(quick_config(), 9).unwrap();
        let first = agent.learn_run(2, &mut NoopSink);
        let second = agent.learn_run(3, &mut NoopSink);
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
        assert_eq!(agent.latency_list().len(), 5);
        assert!(!agent.trace().is_zero());

        agent.reset();
        assert!(agent.latency_list().is_empty());
        assert!(agent.trace().is_zero());
        assert_eq!(agent.position(), Position::new(0.1, 0.1));
        assert!(agent
            .weights()
            .as_slice()
            .iter()
            .all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn start_inside_target_has_zero_latency() {
        let mut cfg = Config::default();
        cfg.arena.start_position = Position::new(0.8, 0.8);
        let mut agent = Agent::new(cfg, 0).unwrap();
        let before = agent.weights().clone();

        let summary = agent.run_trial(&mut NoopSink);
        assert_eq!(summary.latency, 0);
        assert_eq!(summary.termination, TerminationReason::Arrived);
        assert_eq!(agent.weights(), &before);
    }
}
