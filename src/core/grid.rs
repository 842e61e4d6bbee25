//! Grid Coordinates
//!
//! Integer cell coordinates used by every mirrored entity.
//! Pixel scaling belongs to the renderer and never appears here.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

/// A cell on the game grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPosition {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl GridPosition {
    /// Origin cell.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a position from column and row.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp each component to {-1, 0, 1}.
    ///
    /// Headings arrive as grid vectors; anything larger is treated as
    /// its sign.
    #[inline]
    pub fn signum(self) -> Self {
        Self {
            x: self.x.signum(),
            y: self.y.signum(),
        }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Movement direction sent by the local player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Row decreases
    Up,
    /// Row increases
    Down,
    /// Column decreases
    Left,
    /// Column increases
    Right,
}

impl Direction {
    /// Single-letter wire code (`u`, `d`, `l`, `r`).
    pub fn code(self) -> char {
        match self {
            Direction::Up => 'u',
            Direction::Down => 'd',
            Direction::Left => 'l',
            Direction::Right => 'r',
        }
    }

    /// Parse a wire code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'u' => Some(Direction::Up),
            'd' => Some(Direction::Down),
            'l' => Some(Direction::Left),
            'r' => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Error for unrecognised key names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction: {0}")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    /// Accepts key names (`up`, `ArrowUp`) and wire codes (`u`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let parsed = match key.as_str() {
            "up" | "arrowup" => Some(Direction::Up),
            "down" | "arrowdown" => Some(Direction::Down),
            "left" | "arrowleft" => Some(Direction::Left),
            "right" | "arrowright" => Some(Direction::Right),
            code => {
                let mut chars = code.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Direction::from_code(c),
                    _ => None,
                }
            }
        };
        parsed.ok_or_else(|| UnknownDirection(s.to_string()))
    }
}
