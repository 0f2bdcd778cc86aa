// src/rl/experiment.rs
//
// Multi-run experiment driver.
//
// Runs are independent: each gets its own agent state and a ChaCha8 stream
// seeded with `base_seed + run_index`. With `threads > 1` the runs are
// spread over scoped worker threads in round-robin lanes; results are
// aggregated in run-index order after every lane joins, so the report is
// bit-identical for any thread count.
//
// Step and trial events reach the sink only in single-threaded mode.
// `on_run_end` is always delivered, in run order.

use std::thread;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{validate_counts, Config, ConfigError};
use crate::logging::{EventSink, NoopSink};
use crate::metrics::{quartile_means, LatencyStats, QuartileMeans};

use super::random::{run_seed, seeded_rng};
use super::runner::Agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub n_trials: usize,
    pub n_runs: usize,
    /// Base seed; run `i` uses `seed + i`.
    pub seed: u64,
    /// Worker threads; 0 picks the available parallelism.
    pub threads: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_trials: 50,
            n_runs: 10,
            seed: 0,
            threads: 1,
        }
    }
}

/// Latencies of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_index: usize,
    /// Seed of the run's generator, when the run had its own stream.
    pub seed: Option<u64>,
    pub latencies: Vec<u64>,
}

/// Spread of one trial index across runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialStats {
    pub trial: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub n_trials: usize,
    pub n_runs: usize,
    pub base_seed: u64,
    pub threads: usize,
    /// Σ_runs latency / n_runs per trial, summed in run order.
    pub mean_latencies: Vec<f64>,
    pub per_trial: Vec<TrialStats>,
    pub runs: Vec<RunOutcome>,
    pub quartiles: Option<QuartileMeans>,
}

pub struct Experiment {
    config: Config,
    settings: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: Config, settings: ExperimentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        validate_counts(settings.n_trials, settings.n_runs)?;
        Ok(Self { config, settings })
    }

    /// Effective worker count, never more than the number of runs.
    pub fn threads(&self) -> usize {
        let requested = match self.settings.threads {
            0 => thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        };
        requested.clamp(1, self.settings.n_runs)
    }

    /// Execute every run. Returns the report and the agent left holding the
    /// last run's weights, trace and latency list.
    pub fn run<S: EventSink + ?Sized>(&self, sink: &mut S) -> (ExperimentReport, Agent) {
        let threads = self.threads();
        let (runs, agent) = if threads == 1 {
            self.run_sequential(sink)
        } else {
            let (runs, agent) = self.run_threaded(threads);
            for outcome in &runs {
                sink.on_run_end(outcome);
            }
            (runs, agent)
        };

        (self.report(runs, threads), agent)
    }

    fn run_sequential<S: EventSink + ?Sized>(&self, sink: &mut S) -> (Vec<RunOutcome>, Agent) {
        let mut agent = self.lane_agent();
        let mut runs = Vec::with_capacity(self.settings.n_runs);
        for run_index in 0..self.settings.n_runs {
            let outcome = self.execute_run(&mut agent, run_index, sink);
            sink.on_run_end(&outcome);
            runs.push(outcome);
        }
        (runs, agent)
    }

    fn run_threaded(&self, threads: usize) -> (Vec<RunOutcome>, Agent) {
        let n_runs = self.settings.n_runs;
        // The lane holding the last run stays on this thread so its agent
        // can be handed back.
        let home_lane = (n_runs - 1) % threads;

        let (mut runs, agent) = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .filter(|lane| *lane != home_lane)
                .map(|lane| scope.spawn(move || self.run_lane(lane, threads).0))
                .collect();

            let (mut runs, agent) = self.run_lane(home_lane, threads);
            for handle in handles {
                let lane_runs = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                runs.extend(lane_runs);
            }
            (runs, agent)
        });

        runs.sort_by_key(|r| r.run_index);
        (runs, agent)
    }

    fn run_lane(&self, lane: usize, stride: usize) -> (Vec<RunOutcome>, Agent) {
        let mut agent = self.lane_agent();
        let runs = (lane..self.settings.n_runs)
            .step_by(stride)
            .map(|run_index| self.execute_run(&mut agent, run_index, &mut NoopSink))
            .collect();
        (runs, agent)
    }

    fn lane_agent(&self) -> Agent {
        Agent::build(self.config.clone(), seeded_rng(self.settings.seed))
    }

    fn execute_run<S: EventSink + ?Sized>(
        &self,
        agent: &mut Agent<ChaCha8Rng>,
        run_index: usize,
        sink: &mut S,
    ) -> RunOutcome {
        let seed = run_seed(self.settings.seed, run_index);
        agent.replace_rng(seeded_rng(seed));
        let latencies = agent.run_fresh(run_index, self.settings.n_trials, sink);
        RunOutcome {
            run_index,
            seed: Some(seed),
            latencies,
        }
    }

    fn report(&self, runs: Vec<RunOutcome>, threads: usize) -> ExperimentReport {
        let n_trials = self.settings.n_trials;
        let n_runs = self.settings.n_runs;

        let mut mean_latencies = vec![0.0; n_trials];
        for run in &runs {
            for (acc, l) in mean_latencies.iter_mut().zip(&run.latencies) {
                *acc += *l as f64 / n_runs as f64;
            }
        }

        let per_trial = (0..n_trials)
            .map(|trial| {
                let stats: LatencyStats = runs
                    .iter()
                    .filter_map(|r| r.latencies.get(trial))
                    .map(|l| *l as f64)
                    .collect();
                TrialStats {
                    trial,
                    mean: stats.mean(),
                    std: stats.std_dev(),
                    min: stats.min(),
                    max: stats.max(),
                }
            })
            .collect();

        ExperimentReport {
            n_trials,
            n_runs,
            base_seed: self.settings.seed,
            threads,
            quartiles: quartile_means(&mean_latencies),
            mean_latencies,
            per_trial,
            runs,
        }
    }
}
