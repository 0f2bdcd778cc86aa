// src/rl/basis.rs
//
// Gaussian basis functions on a fixed N x N grid of reference points.
//
// Reference point (i, j) sits at (i/(N-1), j/(N-1)) and owns the cell index
// i + N*j. The grid is immutable for the lifetime of a run and shared by
// all actions.

use crate::config::BasisConfig;
use crate::types::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct BasisGrid {
    size: usize,
    /// 2σ², precomputed.
    two_sigma_sq: f64,
}

impl BasisGrid {
    pub fn new(size: usize, sigma: f64) -> Self {
        Self {
            size,
            two_sigma_sq: 2.0 * sigma * sigma,
        }
    }

    pub fn from_config(cfg: &BasisConfig) -> Self {
        Self::new(cfg.grid_size, cfg.sigma)
    }

    /// Reference points per axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of basis functions (`size²`).
    pub fn num_cells(&self) -> usize {
        self.size * self.size
    }

    pub fn cell_index(&self, i: usize, j: usize) -> usize {
        i + self.size * j
    }

    /// Location of reference point `(i, j)`.
    pub fn center(&self, i: usize, j: usize) -> Position {
        let spacing = if self.size > 1 {
            1.0 / (self.size - 1) as f64
        } else {
            0.0
        };
        Position::new(i as f64 * spacing, j as f64 * spacing)
    }

    /// Activation of basis function `(i, j)` at `pos`, in `(0, 1]`.
    pub fn activation(&self, pos: &Position, i: usize, j: usize) -> f64 {
        let c = self.center(i, j);
        (-pos.distance_sq(&c) / self.two_sigma_sq).exp()
    }

    /// Activations of every basis function, in cell-index order.
    pub fn features(&self, pos: &Position) -> Vec<f64> {
        let mut out = vec![0.0; self.num_cells()];
        self.features_into(pos, &mut out);
        out
    }

    /// Same as [`BasisGrid::features`], writing into a caller buffer.
    pub fn features_into(&self, pos: &Position, out: &mut [f64]) {
        assert_eq!(out.len(), self.num_cells(), "feature buffer has wrong length");
        for j in 0..self.size {
            for i in 0..self.size {
                out[self.cell_index(i, j)] = self.activation(pos, i, j);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> BasisGrid {
        BasisGrid::new(20, 0.05)
    }

    #[test]
    fn reference_points_span_the_unit_square() {
        let g = grid();
        assert_eq!(g.num_cells(), 400);
        assert_eq!(g.center(0, 0), Position::new(0.0, 0.0));
        let last = g.center(19, 19);
        assert!((last.x - 1.0).abs() < 1e-12);
        assert!((last.y - 1.0).abs() < 1e-12);
        let c = g.center(3, 7);
        assert!((c.x - 3.0 / 19.0).abs() < 1e-15);
        assert!((c.y - 7.0 / 19.0).abs() < 1e-15);
    }

    #[test]
    fn activation_is_one_at_the_center() {
        let g = grid();
        for &(i, j) in &[(0, 0), (5, 11), (19, 19)] {
            let c = g.center(i, j);
            assert_eq!(g.activation(&c, i, j), 1.0);
        }
    }

    #[test]
    fn activation_is_bounded_and_below_one_off_center() {
        let g = grid();
        let probes = [
            Position::new(0.1, 0.1),
            Position::new(0.37, 0.92),
            Position::new(0.999, 0.001),
            Position::new(0.5, 0.5),
        ];
        for p in &probes {
            for j in 0..20 {
                for i in 0..20 {
                    let a = g.activation(p, i, j);
                    assert!(a <= 1.0);
                    assert!(a >= 0.0);
                    if *p != g.center(i, j) {
                        assert!(a < 1.0);
                    }
                }
            }
        }
        // Nearby probes never underflow to zero.
        let a = g.activation(&Position::new(0.1, 0.1), 2, 2);
        assert!(a > 0.0);
    }

    #[test]
    fn activation_decreases_with_distance() {
        let g = grid();
        let c = g.center(10, 10);
        let mut prev = g.activation(&c, 10, 10);
        for k in 1..30 {
            let p = Position::new(c.x + k as f64 * 0.005, c.y + k as f64 * 0.002);
            let a = g.activation(&p, 10, 10);
            assert!(a < prev, "step {k}: {a} !< {prev}");
            prev = a;
        }
    }

    #[test]
    fn features_follow_cell_index_layout() {
        let g = grid();
        let p = Position::new(0.42, 0.13);
        let f = g.features(&p);
        assert_eq!(f.len(), 400);
        assert_eq!(f[g.cell_index(4, 9)], g.activation(&p, 4, 9));
        assert_eq!(f[g.cell_index(17, 2)], g.activation(&p, 17, 2));
    }

    #[test]
    fn smaller_sigma_is_more_local() {
        let wide = BasisGrid::new(20, 0.1);
        let narrow = BasisGrid::new(20, 0.02);
        let p = Position::new(0.3, 0.3);
        assert!(narrow.activation(&p, 10, 10) < wide.activation(&p, 10, 10));
    }
}
