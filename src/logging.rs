// src/logging.rs
//
// Event sinks for the learner.
// - EventSink:          trait driven by the trial controller / experiment
// - NoopSink:           discards all events
// - TrajectoryRecorder: in-memory path of the current trial + latencies
// - FileSink:           one JSON object per line (JSONL)
//
// Sinks observe; they never influence learning. I/O failures are swallowed.

use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{json, Value as JsonValue};

use crate::rl::experiment::RunOutcome;
use crate::rl::runner::TrialSummary;
use crate::rl::step::StepContext;
use crate::types::Position;

/// Observer of learner progress.
pub trait EventSink {
    /// Called after every step with the updated context and the step reward.
    fn on_step(&mut self, trial: usize, step: u64, ctx: &StepContext, reward: f64);

    /// Called when a trial reaches a terminal state.
    fn on_trial_end(&mut self, summary: &TrialSummary);

    /// Called once per completed run.
    fn on_run_end(&mut self, outcome: &RunOutcome);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_step(&mut self, trial: usize, step: u64, ctx: &StepContext, reward: f64) {
        (**self).on_step(trial, step, ctx, reward)
    }

    fn on_trial_end(&mut self, summary: &TrialSummary) {
        (**self).on_trial_end(summary)
    }

    fn on_run_end(&mut self, outcome: &RunOutcome) {
        (**self).on_run_end(outcome)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn on_step(&mut self, trial: usize, step: u64, ctx: &StepContext, reward: f64) {
        (**self).on_step(trial, step, ctx, reward)
    }

    fn on_trial_end(&mut self, summary: &TrialSummary) {
        (**self).on_trial_end(summary)
    }

    fn on_run_end(&mut self, outcome: &RunOutcome) {
        (**self).on_run_end(outcome)
    }
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_step(&mut self, _trial: usize, _step: u64, _ctx: &StepContext, _reward: f64) {
        // intentionally no-op
    }

    fn on_trial_end(&mut self, _summary: &TrialSummary) {}

    fn on_run_end(&mut self, _outcome: &RunOutcome) {}
}

/// Keeps the path of the trial in progress and the latency of every
/// completed trial. This is the hand-off point for plotting tools.
#[derive(Debug, Default, Clone)]
pub struct TrajectoryRecorder {
    current: Vec<Position>,
    last_trajectory: Vec<Position>,
    latencies: Vec<u64>,
    runs_completed: usize,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions visited so far in the running trial.
    pub fn current_trajectory(&self) -> &[Position] {
        &self.current
    }

    /// Full path of the most recently finished trial.
    pub fn last_trajectory(&self) -> &[Position] {
        &self.last_trajectory
    }

    /// Latencies of every finished trial, across runs, in completion order.
    pub fn latencies(&self) -> &[u64] {
        &self.latencies
    }

    pub fn runs_completed(&self) -> usize {
        self.runs_completed
    }
}

impl EventSink for TrajectoryRecorder {
    fn on_step(&mut self, _trial: usize, step: u64, ctx: &StepContext, _reward: f64) {
        if step == 1 {
            self.current.clear();
            self.current.push(ctx.prev_state);
        }
        self.current.push(ctx.state);
    }

    fn on_trial_end(&mut self, summary: &TrialSummary) {
        self.last_trajectory = std::mem::take(&mut self.current);
        self.latencies.push(summary.latency);
    }

    fn on_run_end(&mut self, _outcome: &RunOutcome) {
        self.runs_completed += 1;
    }
}

/// JSONL file sink.
///
/// Trial and run events are always written; step events only when enabled
/// with [`FileSink::with_steps`], since a single timed-out trial produces
/// ten thousand of them.
pub struct FileSink {
    writer: Option<BufWriter<File>>,
    steps: bool,
}

impl FileSink {
    /// Create (truncate) `path`, creating parent directories as needed.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            steps: false,
        })
    }

    pub fn with_steps(mut self, enabled: bool) -> Self {
        self.steps = enabled;
        self
    }

    fn write_json(&mut self, value: &JsonValue) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let failed = serde_json::to_writer(&mut *writer, value).is_err()
            || writer.write_all(b"\n").is_err();
        if failed {
            // Stop writing after the first failure; learning continues.
            self.writer = None;
        }
    }

    fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

impl EventSink for FileSink {
    fn on_step(&mut self, trial: usize, step: u64, ctx: &StepContext, reward: f64) {
        if !self.steps {
            return;
        }
        self.write_json(&json!({
            "event": "step",
            "trial": trial,
            "step": step,
            "x": ctx.state.x,
            "y": ctx.state.y,
            "action": ctx.action,
            "reward": reward,
            "wall_touched": ctx.wall_touched,
        }));
    }

    fn on_trial_end(&mut self, summary: &TrialSummary) {
        let mut value = json!({ "event": "trial_end" });
        if let (JsonValue::Object(map), Ok(JsonValue::Object(fields))) =
            (&mut value, serde_json::to_value(summary))
        {
            map.extend(fields);
        }
        self.write_json(&value);
        self.flush();
    }

    fn on_run_end(&mut self, outcome: &RunOutcome) {
        let mean = if outcome.latencies.is_empty() {
            0.0
        } else {
            outcome.latencies.iter().sum::<u64>() as f64 / outcome.latencies.len() as f64
        };
        self.write_json(&json!({
            "event": "run_end",
            "run": outcome.run_index,
            "seed": outcome.seed,
            "n_trials": outcome.latencies.len(),
            "mean_latency": mean,
            "latencies": outcome.latencies,
        }));
        self.flush();
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Sink selected by the environment:
/// - GRIDWORLD_TELEMETRY_MODE: "off" (default) or "jsonl"
/// - GRIDWORLD_TELEMETRY_PATH: JSONL path (default `gridworld_telemetry.jsonl`)
///
/// Falls back to [`NoopSink`] when the file cannot be created.
pub fn telemetry_from_env() -> Box<dyn EventSink> {
    let jsonl = env::var("GRIDWORLD_TELEMETRY_MODE")
        .map(|s| s.trim().eq_ignore_ascii_case("jsonl"))
        .unwrap_or(false);
    if !jsonl {
        return Box::new(NoopSink);
    }

    let path = env::var("GRIDWORLD_TELEMETRY_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("gridworld_telemetry.jsonl"));

    match FileSink::create(&path) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            eprintln!(
                "[telemetry] WARN: cannot open {}: {}; telemetry disabled",
                path.display(),
                e
            );
            Box::new(NoopSink)
        }
    }
}
