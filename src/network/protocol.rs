//! Protocol Messages
//!
//! Wire format for the snake server. Frames are text. Two of them are
//! bare literals rather than JSON:
//!
//! - the latency probe and its echo, `p`
//! - movement, `m:<playerId>:<dir>`
//!
//! Everything else is a JSON envelope `{ "event": <tag>, ...payload }`.
//! Inbound frames are decoded exactly once, here, into [`InboundFrame`] so
//! the reconciler never looks at raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::grid::{Direction, GridPosition};
use crate::core::ids::PlayerId;
use crate::game::food::FoodTuple;
use crate::game::snake::{PartialColors, Snake, SnakeColors, SnakeKind, DEFAULT_SPAWN, DEFAULT_SPEED};
use crate::game::store::SnakePatch;

/// Bare literal used for the latency probe and its echo.
pub const PROBE_SENTINEL: &str = "p";

/// Protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Known event whose payload does not fit its schema.
    #[error("invalid {event} payload: {source}")]
    Schema {
        /// Event tag
        event: &'static str,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// Outbound command could not be serialized.
    #[error("failed to encode command: {0}")]
    Encode(#[source] serde_json::Error),
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Echo of our latency probe.
    ProbeEcho,
    /// JSON event.
    Event(ServerEvent),
}

/// Decoded server event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Server accepted the connection.
    Verified,
    /// Initial configuration (food list).
    Config(ConfigPayload),
    /// Full roster snapshot.
    WaitingRoomStatus(RosterPayload),
    /// Incremental per-snake diffs (`snake_update_v2`).
    SnakeUpdate(SnakeUpdatePayload),
    /// Single food item moved.
    UpdateFood(FoodUpdatePayload),
    /// Envelope with an unmapped (or missing) tag.
    Unknown {
        /// Tag as received
        event: Option<String>,
    },
}

impl ServerEvent {
    /// Wire tag of this event.
    pub fn tag(&self) -> &str {
        match self {
            ServerEvent::Verified => "verified",
            ServerEvent::Config(_) => "config",
            ServerEvent::WaitingRoomStatus(_) => "waitingRoomStatus",
            ServerEvent::SnakeUpdate(_) => "snake_update_v2",
            ServerEvent::UpdateFood(_) => "updateFood",
            ServerEvent::Unknown { event } => event.as_deref().unwrap_or("<none>"),
        }
    }
}

/// `config` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigPayload {
    /// Initial food list
    pub food: Vec<FoodTuple>,
    /// Cosmetic settings
    pub config: Option<ConfigSettings>,
}

/// Nested `config.config` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigSettings {
    /// Background index picked by the server
    pub background_number: Option<u32>,
}

/// `waitingRoomStatus` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RosterPayload {
    /// Every known player
    pub players: Vec<RosterEntry>,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterEntry {
    /// Player id
    pub id: PlayerId,
    /// `"player"` or another kind
    #[serde(rename = "type", default)]
    pub kind: SnakeKind,
    /// Palette (parts may be missing)
    #[serde(default)]
    pub colours: PartialColors,
    /// Snake state
    #[serde(default)]
    pub snake: RosterSnake,
}

/// Snake state inside a roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RosterSnake {
    /// Head column
    pub x: i32,
    /// Head row
    pub y: i32,
    /// Length hint
    pub size: u32,
    /// Tail cells
    pub tail: Vec<GridPosition>,
    /// Heading
    pub speed: GridPosition,
    /// Dead flag
    pub is_dead: bool,
    /// Score, 0 when absent
    pub score: Option<u32>,
}

impl Default for RosterSnake {
    fn default() -> Self {
        Self {
            x: DEFAULT_SPAWN.x,
            y: DEFAULT_SPAWN.y,
            size: 0,
            tail: Vec::new(),
            speed: DEFAULT_SPEED,
            is_dead: false,
            score: None,
        }
    }
}

impl RosterEntry {
    /// Build a fresh snake from this entry.
    pub fn into_snake(self) -> (PlayerId, Snake) {
        let state = self.snake;
        let mut snake = Snake::new(
            self.kind,
            GridPosition::new(state.x, state.y),
            self.colours.resolve(),
            state.size,
        );
        snake.tail = state.tail;
        snake.set_direction(state.speed);
        snake.is_dead = state.is_dead;
        snake.score = state.score.unwrap_or(0);
        (self.id, snake)
    }
}

/// `snake_update_v2` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SnakeUpdatePayload {
    /// Per-snake diffs
    pub snakes: Vec<SnakeDiff>,
}

/// Diff for one snake.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnakeDiff {
    /// Target player
    pub player_id: PlayerId,
    /// Head column
    pub x: i32,
    /// Head row
    pub y: i32,
    /// Replacement tail
    #[serde(default)]
    pub tail: Vec<GridPosition>,
    /// Replacement score
    #[serde(default)]
    pub score: u32,
    /// Dead flag
    #[serde(default)]
    pub is_dead: bool,
}

impl SnakeDiff {
    /// Split into target id and store patch.
    pub fn into_patch(self) -> (PlayerId, SnakePatch) {
        (
            self.player_id,
            SnakePatch {
                position: GridPosition::new(self.x, self.y),
                tail: self.tail,
                score: self.score,
                is_dead: self.is_dead,
            },
        )
    }
}

/// `updateFood` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FoodUpdatePayload {
    /// Normally exactly one tuple
    pub food: Vec<FoodTuple>,
}

/// Classify and decode one inbound text frame.
pub fn decode_frame(text: &str) -> Result<InboundFrame, ProtocolError> {
    if text == PROBE_SENTINEL {
        return Ok(InboundFrame::ProbeEcho);
    }

    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
    let tag = value.get("event").and_then(Value::as_str).map(str::to_owned);

    let event = match tag.as_deref() {
        Some("verified") => ServerEvent::Verified,
        Some("config") => ServerEvent::Config(payload("config", value)?),
        Some("waitingRoomStatus") => {
            ServerEvent::WaitingRoomStatus(payload("waitingRoomStatus", value)?)
        }
        Some("snake_update_v2") => ServerEvent::SnakeUpdate(payload("snake_update_v2", value)?),
        Some("updateFood") => ServerEvent::UpdateFood(payload("updateFood", value)?),
        _ => ServerEvent::Unknown { event: tag },
    };

    Ok(InboundFrame::Event(event))
}

fn payload<T>(event: &'static str, value: Value) -> Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value).map_err(|source| ProtocolError::Schema { event, source })
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Commands sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Register the local player after `verified`.
    NewPlayer {
        /// Display name
        name: String,
        /// Player id
        id: PlayerId,
        /// Chosen palette
        colours: SnakeColors,
    },
    /// Local start action.
    StartGame,
    /// Steer the local snake.
    Move {
        /// Local player id
        player_id: PlayerId,
        /// New direction
        direction: Direction,
    },
    /// Latency probe.
    Probe,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum JsonEnvelope<'a> {
    NewPlayer { player: NewPlayerBody<'a> },
    StartGame,
}

#[derive(Serialize)]
struct NewPlayerBody<'a> {
    name: &'a str,
    id: &'a PlayerId,
    colours: &'a SnakeColors,
}

impl ClientCommand {
    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        match self {
            ClientCommand::NewPlayer { name, id, colours } => {
                let envelope = JsonEnvelope::NewPlayer {
                    player: NewPlayerBody { name, id, colours },
                };
                serde_json::to_string(&envelope).map_err(ProtocolError::Encode)
            }
            ClientCommand::StartGame => {
                serde_json::to_string(&JsonEnvelope::StartGame).map_err(ProtocolError::Encode)
            }
            ClientCommand::Move { player_id, direction } => {
                Ok(format!("m:{}:{}", player_id, direction.code()))
            }
            ClientCommand::Probe => Ok(PROBE_SENTINEL.to_string()),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::NewPlayer { .. } => "newPlayer",
            ClientCommand::StartGame => "startGame",
            ClientCommand::Move { .. } => "move",
            ClientCommand::Probe => "probe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::food::FoodKind;

    fn event(text: &str) -> ServerEvent {
        match decode_frame(text).unwrap() {
            InboundFrame::Event(e) => e,
            InboundFrame::ProbeEcho => panic!("unexpected probe echo"),
        }
    }

    #[test]
    fn test_probe_sentinel_bypasses_json() {
        assert_eq!(decode_frame("p").unwrap(), InboundFrame::ProbeEcho);
        // A JSON string "p" is not the sentinel.
        assert!(matches!(
            decode_frame("\"p\"").unwrap(),
            InboundFrame::Event(ServerEvent::Unknown { event: None })
        ));
    }

    #[test]
    fn test_malformed_frame() {
        assert!(matches!(decode_frame("{not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode_frame(""), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_unknown_event() {
        let e = event(r#"{"event":"chat","text":"hi"}"#);
        assert_eq!(e, ServerEvent::Unknown { event: Some("chat".into()) });
        assert_eq!(e.tag(), "chat");
    }

    #[test]
    fn test_missing_tag_is_unknown() {
        assert_eq!(event(r#"{"foo":1}"#), ServerEvent::Unknown { event: None });
    }

    #[test]
    fn test_verified() {
        assert_eq!(event(r#"{"event":"verified"}"#), ServerEvent::Verified);
    }

    #[test]
    fn test_config_with_background() {
        let e = event(
            r#"{"event":"config","config":{"backgroundNumber":2},"food":[[1,2,0,"cherry"],[3,4,1,"chili"]]}"#,
        );
        let ServerEvent::Config(cfg) = e else { panic!("wrong event") };
        assert_eq!(cfg.food.len(), 2);
        assert_eq!(cfg.food[1], FoodTuple(3, 4, 1, FoodKind::Chili));
        assert_eq!(cfg.config.unwrap().background_number, Some(2));
    }

    #[test]
    fn test_roster_defaults() {
        let e = event(r#"{"event":"waitingRoomStatus","players":[{"id":"A","snake":{"x":2,"y":4}}]}"#);
        let ServerEvent::WaitingRoomStatus(roster) = e else { panic!("wrong event") };
        let (id, snake) = roster.players.into_iter().next().unwrap().into_snake();
        assert_eq!(id, PlayerId::new("A"));
        assert!(snake.kind.is_player());
        assert_eq!(snake.score, 0);
        assert!(!snake.is_dead);
        assert!(snake.tail.is_empty());
        assert_eq!(snake.position, GridPosition::new(2, 4));
    }

    #[test]
    fn test_roster_full_entry() {
        let e = event(
            r#"{"event":"waitingRoomStatus","players":[{"id":7,"type":"bot",
                "colours":{"body":"red","head":"blue","eyes":"white"},
                "snake":{"x":5,"y":6,"size":3,"tail":[{"x":4,"y":6}],
                         "speed":{"x":0,"y":1},"isDead":true,"score":9}}]}"#,
        );
        let ServerEvent::WaitingRoomStatus(roster) = e else { panic!("wrong event") };
        let (id, snake) = roster.players.into_iter().next().unwrap().into_snake();
        assert_eq!(id, PlayerId::new("7"));
        assert_eq!(snake.kind.as_str(), "bot");
        assert_eq!(snake.colors.body, "red");
        assert_eq!(snake.size, 3);
        assert_eq!(snake.tail, vec![GridPosition::new(4, 6)]);
        assert_eq!(snake.speed, GridPosition::new(0, 1));
        assert!(snake.is_dead);
        assert_eq!(snake.score, 9);
    }

    #[test]
    fn test_snake_update() {
        let e = event(
            r#"{"event":"snake_update_v2","snakes":[{"playerId":"A","x":3,"y":4,"tail":[{"x":2,"y":4}],"score":1,"isDead":false}]}"#,
        );
        let ServerEvent::SnakeUpdate(update) = e else { panic!("wrong event") };
        let (id, patch) = update.snakes.into_iter().next().unwrap().into_patch();
        assert_eq!(id, PlayerId::new("A"));
        assert_eq!(patch.position, GridPosition::new(3, 4));
        assert_eq!(patch.score, 1);
        assert!(!patch.is_dead);
    }

    #[test]
    fn test_schema_error_for_known_event() {
        let err = decode_frame(r#"{"event":"snake_update_v2","snakes":[{"x":1}]}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Schema { event: "snake_update_v2", .. }));
    }

    #[test]
    fn test_update_food() {
        let e = event(r#"{"event":"updateFood","food":[[5,6,3,"banana"]]}"#);
        assert_eq!(
            e,
            ServerEvent::UpdateFood(FoodUpdatePayload {
                food: vec![FoodTuple(5, 6, 3, FoodKind::Banana)]
            })
        );
    }

    #[test]
    fn test_encode_new_player() {
        let cmd = ClientCommand::NewPlayer {
            name: "Ann".into(),
            id: PlayerId::new("42"),
            colours: SnakeColors {
                body: "red".into(),
                head: "blue".into(),
                eyes: "white".into(),
            },
        };
        let json: Value = serde_json::from_str(&cmd.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "newPlayer",
                "player": {
                    "name": "Ann",
                    "id": "42",
                    "colours": {"body": "red", "head": "blue", "eyes": "white"}
                }
            })
        );
    }

    #[test]
    fn test_encode_start_game() {
        let json: Value = serde_json::from_str(&ClientCommand::StartGame.encode().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"event": "startGame"}));
    }

    #[test]
    fn test_encode_compact_frames() {
        let mv = ClientCommand::Move {
            player_id: PlayerId::new("42"),
            direction: Direction::Left,
        };
        assert_eq!(mv.encode().unwrap(), "m:42:l");
        assert_eq!(ClientCommand::Probe.encode().unwrap(), "p");
    }
}
