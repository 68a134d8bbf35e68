//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

// Generation-checked handles. A handle whose entity was removed resolves to
// `None` on lookup instead of aliasing a newer entity in the same slot.
new_key_type! {
    pub struct SettlementId;
    pub struct StructureId;
    pub struct RoadId;
    pub struct AgentId;
}

/// Simulation step counter
pub type Tick = u64;

/// 2D position in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::default()
        }
    }

    /// Point at `radius` from self in direction `angle` (radians)
    pub fn offset_polar(&self, radius: f32, angle: f32) -> Self {
        Self {
            x: self.x + radius * angle.cos(),
            y: self.y + radius * angle.sin(),
        }
    }

    /// Move toward `target` by at most `max_step`, never overshooting
    pub fn step_toward(&self, target: Vec2, max_step: f32) -> Self {
        let delta = target - *self;
        let dist = delta.length();
        if dist <= max_step || dist < 0.0001 {
            target
        } else {
            *self + delta.normalize() * max_step
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

/// Integer grid cell address (column, row)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The 8 surrounding cells (center excluded), orthogonal first
    pub fn neighbors(&self) -> [Cell; 8] {
        let Cell { col, row } = *self;
        [
            Cell::new(col + 1, row),
            Cell::new(col - 1, row),
            Cell::new(col, row + 1),
            Cell::new(col, row - 1),
            Cell::new(col + 1, row + 1),
            Cell::new(col + 1, row - 1),
            Cell::new(col - 1, row + 1),
            Cell::new(col - 1, row - 1),
        ]
    }

    pub fn is_diagonal_to(&self, other: &Cell) -> bool {
        self.col != other.col && self.row != other.row
    }

    pub fn manhattan(&self, other: &Cell) -> i32 {
        (self.col - other.col).abs() + (self.row - other.row).abs()
    }

    /// Chebyshev (king-move) distance
    pub fn chebyshev(&self, other: &Cell) -> i32 {
        (self.col - other.col).abs().max((self.row - other.row).abs())
    }
}
