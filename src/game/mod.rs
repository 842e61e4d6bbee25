//! Game Model Module
//!
//! The locally mirrored world and the session lifecycle. Nothing here
//! decides game outcomes; every change originates from a server event or
//! from the local player's own actions.
//!
//! ## Module Structure
//!
//! - `snake`: Snake model and death transition
//! - `food`: Food items and wire tuples
//! - `store`: Entity store merge primitives
//! - `score`: Detached score submission
//! - `session`: Session phases and lifecycle controller

pub mod snake;
pub mod food;
pub mod store;
pub mod score;
pub mod session;

// Re-export key types
pub use snake::{Snake, SnakeColors, SnakeKind, PartialColors};
pub use food::{FoodItem, FoodKind, FoodTuple};
pub use store::{EntityStore, SnakePatch, PatchOutcome};
pub use score::{ScoreClaim, ScoreSubmitter, SubmitError, LoggingSubmitter, RecordingSubmitter};
pub use session::{LifecycleController, LifecycleError, SessionPhase, SessionState};
