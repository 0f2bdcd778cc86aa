// src/rl/matrix.rs
//
// Dense (cell, action) matrix used for both the weights and the
// eligibility trace, plus the linear action-value estimate built on it.
//
// Layout is row-major by cell: entry (cell, action) lives at
// cell * NUM_ACTIONS + action.

use serde::{Deserialize, Serialize};

use crate::types::{Action, NUM_ACTIONS};

use super::random::RandomSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMatrix {
    cells: usize,
    values: Vec<f64>,
}

impl ActionMatrix {
    pub fn zeros(cells: usize) -> Self {
        Self {
            cells,
            values: vec![0.0; cells * NUM_ACTIONS],
        }
    }

    /// Every entry drawn uniformly from `[0, 1)`, in layout order.
    pub fn random<R: RandomSource + ?Sized>(cells: usize, rng: &mut R) -> Self {
        let values = (0..cells * NUM_ACTIONS).map(|_| rng.uniform()).collect();
        Self { cells, values }
    }

    /// `(cells, actions)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.cells, NUM_ACTIONS)
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn get(&self, cell: usize, action: Action) -> f64 {
        self.values[cell * NUM_ACTIONS + action.index()]
    }

    pub fn set(&mut self, cell: usize, action: Action, value: f64) {
        self.values[cell * NUM_ACTIONS + action.index()] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn fill(&mut self, value: f64) {
        self.values.iter_mut().for_each(|v| *v = value);
    }

    /// `self *= factor`.
    pub fn scale(&mut self, factor: f64) {
        self.values.iter_mut().for_each(|v| *v *= factor);
    }

    /// `self[:, action] += column`.
    pub fn add_to_column(&mut self, action: Action, column: &[f64]) {
        assert_eq!(column.len(), self.cells, "column has wrong length");
        let a = action.index();
        for (cell, c) in column.iter().enumerate() {
            self.values[cell * NUM_ACTIONS + a] += c;
        }
    }

    /// `self += alpha * other`.
    pub fn add_scaled(&mut self, alpha: f64, other: &ActionMatrix) {
        assert_eq!(self.shape(), other.shape(), "matrix shapes differ");
        for (w, e) in self.values.iter_mut().zip(&other.values) {
            *w += alpha * e;
        }
    }

    /// Linear action value `Σ_cells self[cell, action] · features[cell]`.
    pub fn q_value(&self, features: &[f64], action: Action) -> f64 {
        assert_eq!(features.len(), self.cells, "feature vector has wrong length");
        let a = action.index();
        let mut q = 0.0;
        for (cell, f) in features.iter().enumerate() {
            q += self.values[cell * NUM_ACTIONS + a] * f;
        }
        q
    }

    /// Action values of all actions for one feature vector.
    pub fn q_values(&self, features: &[f64]) -> [f64; NUM_ACTIONS] {
        let mut out = [0.0; NUM_ACTIONS];
        for a in Action::all() {
            out[a.index()] = self.q_value(features, a);
        }
        out
    }
}
