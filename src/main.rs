// src/main.rs
//
// Thin harness around the gridworld library.
// All of the learning logic lives in the lib crate; this binary resolves the
// configuration, runs an experiment and writes the outputs.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use serde::Serialize;

use gridworld::{
    learning_curve, telemetry_from_env, Config, EventSink, Experiment, ExperimentConfig,
    ExperimentReport, FileSink, RunOutcome, StepContext, TrialSummary,
};

/// Command-line arguments for the gridworld binary.
#[derive(Parser, Debug)]
#[command(name = "gridworld", version, about = "SARSA(λ) navigation in a continuous arena")]
struct Cli {
    /// Trials per run.
    #[arg(long, default_value_t = 50)]
    trials: usize,

    /// Independent runs to average over.
    #[arg(long, default_value_t = 10)]
    runs: usize,

    /// Base seed; run i uses seed + i.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Worker threads (0 = available parallelism).
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    epsilon: Option<f64>,

    /// Eligibility trace decay λ.
    #[arg(long)]
    lambda: Option<f64>,

    /// Width of the Gaussian basis functions.
    #[arg(long)]
    sigma: Option<f64>,

    /// Learning rate η.
    #[arg(long)]
    eta: Option<f64>,

    /// Discount γ.
    #[arg(long)]
    gamma: Option<f64>,

    /// Step cap per trial.
    #[arg(long)]
    max_steps: Option<u64>,

    /// Time constant of the smoothed learning curve (1 = no smoothing).
    #[arg(long, default_value_t = 1.0)]
    filter: f64,

    /// Directory for summary.json and learning_curve.csv.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// JSONL event log including every step (single-threaded runs only).
    #[arg(long)]
    trajectory_jsonl: Option<PathBuf>,

    /// Suppress per-run progress lines.
    #[arg(long)]
    quiet: bool,

    /// Print every trial (-v).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Defaults, then YAML, then env research overrides, then CLI flags.
fn build_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    cfg.apply_env_overrides();

    if let Some(v) = cli.epsilon {
        cfg.learning.epsilon = v;
    }
    if let Some(v) = cli.lambda {
        cfg.learning.lambda_eligibility = v;
    }
    if let Some(v) = cli.sigma {
        cfg.basis.sigma = v;
    }
    if let Some(v) = cli.eta {
        cfg.learning.eta = v;
    }
    if let Some(v) = cli.gamma {
        cfg.learning.gamma = v;
    }
    if let Some(v) = cli.max_steps {
        cfg.trial.max_steps = v;
    }

    Ok(cfg)
}

/// Console progress on top of the telemetry sink.
struct ConsoleSink {
    inner: Box<dyn EventSink>,
    quiet: bool,
    verbose: u8,
}

impl EventSink for ConsoleSink {
    fn on_step(&mut self, trial: usize, step: u64, ctx: &StepContext, reward: f64) {
        self.inner.on_step(trial, step, ctx, reward);
    }

    fn on_trial_end(&mut self, summary: &TrialSummary) {
        if self.verbose > 0 && !self.quiet {
            println!(
                "  run={} trial={} latency={} end={:?} walls={} reward={:.1}",
                summary.run,
                summary.trial,
                summary.latency,
                summary.termination,
                summary.wall_touches,
                summary.total_reward
            );
        }
        self.inner.on_trial_end(summary);
    }

    fn on_run_end(&mut self, outcome: &RunOutcome) {
        if !self.quiet {
            let n = outcome.latencies.len().max(1) as f64;
            let mean = outcome.latencies.iter().sum::<u64>() as f64 / n;
            println!(
                "run {:>3} seed={} mean_latency={:.1} first={} last={}",
                outcome.run_index,
                outcome
                    .seed
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                mean,
                outcome.latencies.first().copied().unwrap_or(0),
                outcome.latencies.last().copied().unwrap_or(0),
            );
        }
        self.inner.on_run_end(outcome);
    }
}

fn build_sink(cli: &Cli) -> Result<Box<dyn EventSink>> {
    match &cli.trajectory_jsonl {
        Some(path) => {
            let sink = FileSink::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(sink.with_steps(true)))
        }
        None => Ok(telemetry_from_env()),
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    version: &'static str,
    config: &'a Config,
    filter: f64,
    smoothed_latencies: &'a [f64],
    report: &'a ExperimentReport,
}

/// Write a file atomically (temp file + rename).
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let temp_name = format!(
        ".tmp_{}_{}",
        std::process::id(),
        path.file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default()
    );
    let temp_path = parent.join(&temp_name);

    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file {}", temp_path.display()))?;
    file.write_all(data)
        .with_context(|| format!("Failed to write temp file {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename into {}", path.display()))?;
    Ok(())
}

fn learning_curve_csv(report: &ExperimentReport, smoothed: &[f64]) -> String {
    let mut out = String::from("trial,mean_latency,smoothed_latency,std_latency\n");
    for ((trial, mean), (smooth, stats)) in report
        .mean_latencies
        .iter()
        .enumerate()
        .zip(smoothed.iter().zip(&report.per_trial))
    {
        let _ = writeln!(out, "{},{},{},{}", trial, mean, smooth, stats.std);
    }
    out
}

fn write_outputs(dir: &Path, cfg: &Config, cli: &Cli, report: &ExperimentReport, smoothed: &[f64]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let summary = Summary {
        version: env!("CARGO_PKG_VERSION"),
        config: cfg,
        filter: cli.filter,
        smoothed_latencies: smoothed,
        report,
    };
    let json = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
    atomic_write(&dir.join("summary.json"), json.as_bytes())?;
    atomic_write(
        &dir.join("learning_curve.csv"),
        learning_curve_csv(report, smoothed).as_bytes(),
    )?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = build_config(&cli)?;
    let settings = ExperimentConfig {
        n_trials: cli.trials,
        n_runs: cli.runs,
        seed: cli.seed,
        threads: cli.threads,
    };
    let experiment = Experiment::new(cfg.clone(), settings).context("Invalid configuration")?;

    println!(
        "gridworld v{} | trials={} runs={} seed={} threads={} epsilon={} lambda={} sigma={} eta={} gamma={} grid={} max_steps={}",
        env!("CARGO_PKG_VERSION"),
        cli.trials,
        cli.runs,
        cli.seed,
        experiment.threads(),
        cfg.learning.epsilon,
        cfg.learning.lambda_eligibility,
        cfg.basis.sigma,
        cfg.learning.eta,
        cfg.learning.gamma,
        cfg.basis.grid_size,
        cfg.trial.max_steps,
    );

    if cli.trajectory_jsonl.is_some() && experiment.threads() > 1 {
        eprintln!(
            "[gridworld] WARN: --trajectory-jsonl records step and trial events only with --threads 1; writing run_end lines only"
        );
    }

    let mut sink = ConsoleSink {
        inner: build_sink(&cli)?,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    let (report, _agent) = experiment.run(&mut sink);
    let smoothed = learning_curve(&report.mean_latencies, cli.filter);

    println!();
    println!("SUMMARY");
    println!("  runs x trials:     {} x {}", report.n_runs, report.n_trials);
    if let (Some(first), Some(last)) = (report.mean_latencies.first(), report.mean_latencies.last()) {
        println!("  mean latency:      first={:.1}  last={:.1}", first, last);
    }
    if let Some(q) = report.quartiles {
        println!(
            "  quartile means:    first={:.1}  last={:.1}  ratio={:.3}",
            q.first,
            q.last,
            q.ratio()
        );
    }

    if let Some(dir) = &cli.output_dir {
        write_outputs(dir, &cfg, &cli, &report, &smoothed)?;
        println!();
        println!("Output written to: {}/", dir.display());
    }

    Ok(())
}
