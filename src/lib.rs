//! # Snake Sync
//!
//! Client-side state synchronization for multiplayer snake. The server is
//! authoritative; this crate mirrors its world and forwards local input.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SNAKE SYNC                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Shared primitives                        │
//! │  ├── grid.rs      - Grid positions and directions            │
//! │  └── ids.rs       - Player identifiers                       │
//! │                                                              │
//! │  game/            - Mirrored world (no outcome decisions)    │
//! │  ├── snake.rs     - Snake model and death transition         │
//! │  ├── food.rs      - Food items                               │
//! │  ├── store.rs     - Entity store merge primitives            │
//! │  ├── score.rs     - Detached score submission                │
//! │  └── session.rs   - Session lifecycle                        │
//! │                                                              │
//! │  network/         - Wire and engine                          │
//! │  ├── protocol.rs  - Frame codec                              │
//! │  ├── transport.rs - WebSocket and in-memory transports       │
//! │  ├── latency.rs   - Round-trip probing                       │
//! │  ├── reconciler.rs- Event merge rules                        │
//! │  └── client.rs    - Engine task and handle                   │
//! │                                                              │
//! │  config.rs        - Environment configuration                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! - One task owns the store; each event is applied to completion
//! - Snapshots are published through a `watch` channel
//! - A dead snake is frozen until a roster replaces it
//! - A death transition runs at most once per snake

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError};
pub use core::grid::{Direction, GridPosition};
pub use core::ids::PlayerId;
pub use game::{EntityStore, FoodItem, FoodKind, ScoreClaim, ScoreSubmitter, SessionPhase, Snake};
pub use network::{ClientHandle, Reconciler, SessionHost, SyncClient};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
