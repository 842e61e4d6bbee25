//! Core primitives.
//!
//! Coordinates and identifiers shared by the world model and the wire format.

pub mod grid;
pub mod ids;

// Re-export core types
pub use grid::{Direction, GridPosition, UnknownDirection};
pub use ids::PlayerId;
