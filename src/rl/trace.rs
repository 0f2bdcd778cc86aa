// src/rl/trace.rs
//
// Eligibility trace: decaying memory of recently active (basis, action)
// pairs. Zero at run start, decayed and incremented every step, never
// cleared between trials of the same run.

use serde::{Deserialize, Serialize};

use crate::types::Action;

use super::matrix::ActionMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityTrace {
    values: ActionMatrix,
}

impl EligibilityTrace {
    pub fn new(cells: usize) -> Self {
        Self {
            values: ActionMatrix::zeros(cells),
        }
    }

    /// Multiply every entry by `factor` (λ·γ in SARSA(λ)).
    pub fn decay(&mut self, factor: f64) {
        self.values.scale(factor);
    }

    /// Credit `action` with the basis activations of the state it was taken in.
    pub fn accumulate(&mut self, action: Action, features: &[f64]) {
        self.values.add_to_column(action, features);
    }

    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    pub fn is_zero(&self) -> bool {
        self.values.as_slice().iter().all(|v| *v == 0.0)
    }

    pub fn matrix(&self) -> &ActionMatrix {
        &self.values
    }

    pub fn get(&self, cell: usize, action: Action) -> f64 {
        self.values.get(cell, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_then_accumulate() {
        let a = Action::new(1).unwrap();
        let mut e = EligibilityTrace::new(2);
        assert!(e.is_zero());

        e.accumulate(a, &[1.0, 0.5]);
        e.decay(0.9 * 0.5);
        e.accumulate(a, &[0.0, 1.0]);

        assert!((e.get(0, a) - 0.45).abs() < 1e-15);
        assert!((e.get(1, a) - (0.225 + 1.0)).abs() < 1e-15);

        e.reset();
        assert!(e.is_zero());
    }
}
