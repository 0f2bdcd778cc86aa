// src/types.rs
//
// Common shared types for the gridworld learner.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of discrete movement directions.
pub const NUM_ACTIONS: usize = 8;

/// Continuous location of the agent inside the arena.
///
/// Valid positions have both coordinates in `[0, 1)`; the transition model
/// never accepts a move that leaves that square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_sq(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Position reached by moving `length` along `action`'s heading.
    pub fn moved(&self, action: Action, length: f64) -> Position {
        let angle = action.angle();
        Position {
            x: self.x + length * angle.cos(),
            y: self.y + length * angle.sin(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// One of the 8 equally spaced movement directions.
///
/// Index `k` heads at angle `2π·k/8`: 0 = east, 2 = north, 4 = west,
/// 6 = south, odd indices are the diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Action(u8);

impl Action {
    /// Returns `None` for indices outside `[0, 8)`.
    pub fn new(index: usize) -> Option<Self> {
        if index < NUM_ACTIONS {
            Some(Action(index as u8))
        } else {
            None
        }
    }

    /// Like [`Action::new`] but wraps the index into range.
    pub fn wrapping(index: usize) -> Self {
        Action((index % NUM_ACTIONS) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Heading in radians, `2π·index/8`.
    pub fn angle(self) -> f64 {
        2.0 * PI * (self.0 as f64) / (NUM_ACTIONS as f64)
    }

    /// All actions in index order.
    pub fn all() -> impl Iterator<Item = Action> {
        (0..NUM_ACTIONS as u8).map(Action)
    }
}

impl TryFrom<u8> for Action {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Action::new(value as usize)
            .ok_or_else(|| format!("action index {} out of range [0, {})", value, NUM_ACTIONS))
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> u8 {
        action.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_range_is_enforced() {
        assert!(Action::new(7).is_some());
        assert!(Action::new(8).is_none());
        assert_eq!(Action::wrapping(9).index(), 1);
        assert_eq!(Action::all().count(), NUM_ACTIONS);
    }

    #[test]
    fn cardinal_moves_follow_headings() {
        let p = Position::new(0.5, 0.5);

        let east = p.moved(Action::new(0).unwrap(), 0.1);
        assert!((east.x - 0.6).abs() < 1e-12);
        assert!((east.y - 0.5).abs() < 1e-12);

        let north = p.moved(Action::new(2).unwrap(), 0.1);
        assert!((north.x - 0.5).abs() < 1e-12);
        assert!((north.y - 0.6).abs() < 1e-12);

        let south_west = p.moved(Action::new(5).unwrap(), 0.1);
        let d = 0.1 / 2f64.sqrt();
        assert!((south_west.x - (0.5 - d)).abs() < 1e-12);
        assert!((south_west.y - (0.5 - d)).abs() < 1e-12);
    }

    #[test]
    fn every_move_has_the_step_length() {
        let p = Position::new(0.3, 0.7);
        for a in Action::all() {
            let q = p.moved(a, 0.03);
            assert!((p.distance_sq(&q).sqrt() - 0.03).abs() < 1e-12, "action {a}");
        }
    }

    #[test]
    fn action_serializes_as_index() {
        let a = Action::new(3).unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "3");

        let parsed: Action = serde_json::from_str("5").unwrap();
        assert_eq!(parsed.index(), 5);
        assert!(serde_json::from_str::<Action>("8").is_err());
    }
}
