// src/metrics.rs
//
// Reporting helpers for latency series.
// - LatencyStats: Welford running mean/variance + min/max.
// - learning_curve: exponential running average of a latency series.
// - quartile_means: mean of the first and last quarter of a series.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    count: u64,
    mean: f64,
    sum_sq_dev: f64,
    min: f64,
    max: f64,
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            sum_sq_dev: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample if finite. Non-finite samples are ignored.
    pub fn push(&mut self, latency: f64) {
        if !latency.is_finite() {
            return;
        }

        self.count += 1;
        self.min = self.min.min(latency);
        self.max = self.max.max(latency);

        let before = latency - self.mean;
        self.mean += before / self.count as f64;
        self.sum_sq_dev += before * (latency - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Population standard deviation (divide by n).
    pub fn std_dev(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum_sq_dev / self.count as f64).sqrt()
        }
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }
}

impl FromIterator<f64> for LatencyStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        for v in iter {
            stats.push(v);
        }
        stats
    }
}

/// Smoothed learning curve.
///
/// `out[0] = l[0]`, `out[i] = out[i-1] + (l[i] - out[i-1]) / filter`.
/// A `filter` of 1 or less (or non-finite) returns the input unchanged.
pub fn learning_curve(latencies: &[f64], filter: f64) -> Vec<f64> {
    if !(filter.is_finite() && filter > 1.0) {
        return latencies.to_vec();
    }

    let mut out = Vec::with_capacity(latencies.len());
    let mut acc = match latencies.first() {
        Some(first) => *first,
        None => return out,
    };
    out.push(acc);
    for l in &latencies[1..] {
        acc += (l - acc) / filter;
        out.push(acc);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuartileMeans {
    pub first: f64,
    pub last: f64,
}

impl QuartileMeans {
    /// `last / first`; below 1 means later trials were faster.
    pub fn ratio(&self) -> f64 {
        self.last / self.first
    }
}

/// Means of the first and last quarter of `series` (at least one element
/// each). `None` for an empty series.
pub fn quartile_means(series: &[f64]) -> Option<QuartileMeans> {
    if series.is_empty() {
        return None;
    }
    let q = (series.len() / 4).max(1);
    let mean = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
    Some(QuartileMeans {
        first: mean(&series[..q]),
        last: mean(&series[series.len() - q..]),
    })
}
