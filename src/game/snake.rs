//! Snake Model
//!
//! Mirrored state of one player or bot snake. Game rules live on the
//! server; this type only records what the server reports and carries
//! the local death transition.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::grid::GridPosition;
use crate::core::ids::PlayerId;
use crate::game::score::ScoreClaim;

/// Alias submitted instead of the player id for anonymous sessions.
pub const ANONYMOUS_ALIAS: &str = "anon";

/// Spawn cell used when the server omits a position.
pub const DEFAULT_SPAWN: GridPosition = GridPosition::new(2, 4);

/// Initial heading when the server omits one.
pub const DEFAULT_SPEED: GridPosition = GridPosition::new(1, 0);

// =============================================================================
// COLOURS
// =============================================================================

/// Colour set for one snake (CSS colour strings).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeColors {
    /// Tail segments
    pub body: String,
    /// Head circle
    pub head: String,
    /// Eye squares
    pub eyes: String,
}

impl SnakeColors {
    /// Palette applied when a snake dies.
    pub fn dead() -> Self {
        Self {
            body: "rgb(139, 0, 0)".to_string(),
            head: "black".to_string(),
            eyes: "gray".to_string(),
        }
    }

    /// A fully random palette.
    pub fn random() -> Self {
        Self {
            body: random_color(),
            head: random_color(),
            eyes: random_color(),
        }
    }
}

/// Colour set as sent by the server; any part may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialColors {
    /// Tail segments
    pub body: Option<String>,
    /// Head circle
    pub head: Option<String>,
    /// Eye squares
    pub eyes: Option<String>,
}

impl PartialColors {
    /// Fill missing or empty entries with random colours.
    pub fn resolve(self) -> SnakeColors {
        fn pick(value: Option<String>) -> String {
            value.filter(|c| !c.is_empty()).unwrap_or_else(random_color)
        }
        SnakeColors {
            body: pick(self.body),
            head: pick(self.head),
            eyes: pick(self.eyes),
        }
    }
}

impl From<SnakeColors> for PartialColors {
    fn from(colors: SnakeColors) -> Self {
        Self {
            body: Some(colors.body),
            head: Some(colors.head),
            eyes: Some(colors.eyes),
        }
    }
}

/// Random `rgb(r, g, b)` colour string.
pub fn random_color() -> String {
    let mut rng = rand::thread_rng();
    let (r, g, b): (u8, u8, u8) = (rng.gen(), rng.gen(), rng.gen());
    format!("rgb({}, {}, {})", r, g, b)
}

// =============================================================================
// SNAKE KIND
// =============================================================================

/// The `type` field of a roster entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
#[derive(Default)]
pub enum SnakeKind {
    /// Human-controlled snake (`"player"`)
    #[default]
    Player,
    /// Any other kind the server reports (bots and so on)
    Other(String),
}

impl SnakeKind {
    /// Whether this snake is controlled by a human player.
    pub fn is_player(&self) -> bool {
        matches!(self, SnakeKind::Player)
    }

    /// Wire string.
    pub fn as_str(&self) -> &str {
        match self {
            SnakeKind::Player => "player",
            SnakeKind::Other(s) => s,
        }
    }
}

impl From<String> for SnakeKind {
    fn from(s: String) -> Self {
        if s == "player" {
            SnakeKind::Player
        } else {
            SnakeKind::Other(s)
        }
    }
}

impl From<SnakeKind> for String {
    fn from(kind: SnakeKind) -> Self {
        kind.as_str().to_string()
    }
}

// =============================================================================
// SNAKE
// =============================================================================

/// Mirrored snake.
///
/// Once `is_dead` is set nothing but a fresh roster snapshot may change
/// the snake again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snake {
    /// Player or bot
    pub kind: SnakeKind,
    /// Head cell
    pub position: GridPosition,
    /// Trailing cells, in server order
    pub tail: Vec<GridPosition>,
    /// Heading, components in {-1, 0, 1}
    pub speed: GridPosition,
    /// Current palette
    pub colors: SnakeColors,
    /// Length hint from the roster
    pub size: u32,
    /// Frozen after death
    pub is_dead: bool,
    /// Food eaten, as reported by the server
    pub score: u32,
}

impl Snake {
    /// Create a live snake with an empty tail.
    pub fn new(kind: SnakeKind, position: GridPosition, colors: SnakeColors, size: u32) -> Self {
        Self {
            kind,
            position,
            tail: Vec::new(),
            speed: DEFAULT_SPEED,
            colors,
            size,
            is_dead: false,
            score: 0,
        }
    }

    /// Set heading (clamped to unit components).
    pub fn set_direction(&mut self, heading: GridPosition) {
        self.speed = heading.signum();
    }

    /// Move the head.
    pub fn set_position(&mut self, position: GridPosition) {
        self.position = position;
    }

    /// Death transition.
    ///
    /// Freezes the snake and repaints it with the dead palette. Returns a
    /// score claim only on the first call and only for player snakes; the
    /// caller decides whether the claim belongs to the local player.
    pub fn stop(&mut self, player_id: &PlayerId, anonymous: bool) -> Option<ScoreClaim> {
        if self.is_dead {
            return None;
        }

        self.is_dead = true;
        self.colors = SnakeColors::dead();

        if !self.kind.is_player() {
            return None;
        }

        let alias = if anonymous {
            ANONYMOUS_ALIAS.to_string()
        } else {
            player_id.to_string()
        };

        Some(ScoreClaim {
            alias,
            score: self.score,
        })
    }
}

impl Default for Snake {
    fn default() -> Self {
        Self::new(SnakeKind::Player, DEFAULT_SPAWN, SnakeColors::random(), 0)
    }
}
