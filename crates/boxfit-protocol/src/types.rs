//! Core protocol types for BoxFit's wire format.
//!
//! Every type here travels "on the wire". Both message enums are
//! *adjacently tagged*: `#[serde(tag = "type", content = "data")]` turns
//! `ClientMessage::PlacePiece { .. }` into
//! `{"type": "place_piece", "data": { ... }}`. Anything that does not match
//! a known tag and its required fields fails to decode, so malformed
//! intents are rejected before they reach a room.

use std::collections::BTreeMap;
use std::fmt;

use boxfit_game::{Grid, Piece, Shape};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The name of a room, taken from the connection path.
///
/// A newtype so a room id can never be passed where a player name is
/// expected. `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a room name. Validation happens in
    /// [`ConnectTarget::parse`](crate::ConnectTarget::parse).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The room name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A player's name: the identity key within one room.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerName(String);

impl PlayerName {
    /// Wraps a player name. Validation happens in
    /// [`ConnectTarget::parse`](crate::ConnectTarget::parse).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Shared payload pieces
// ---------------------------------------------------------------------------

/// A grid coordinate: `x` is the column, `y` is the row.
///
/// Signed so that a negative coordinate decodes and is reported as a bad
/// intent instead of a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Returns `true` if both coordinates are valid cell indices.
    pub fn is_on_grid(&self) -> bool {
        Grid::contains(self.y, self.x)
    }
}

/// What every member sees about a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub color: String,
    pub connected: bool,
}

/// The full player map, ordered by name so every member receives the
/// same bytes.
pub type PlayerMap = BTreeMap<PlayerName, PlayerInfo>;

// ---------------------------------------------------------------------------
// ErrorKind — how a rejection is reported
// ---------------------------------------------------------------------------

/// The category of a rejected intent, sent to the requester only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A connected player already uses this name in the room.
    NameConflict,
    /// The piece would leave the grid or overlap an occupied cell.
    InvalidPlacement,
    /// The payload failed structural validation.
    MalformedIntent,
    /// A rotation referred to an offered piece that has been replaced.
    StalePiece,
    /// The room is shutting down or gone.
    RoomUnavailable,
}

impl ErrorKind {
    /// HTTP-style status code carried next to the kind.
    pub fn code(self) -> u16 {
        match self {
            Self::NameConflict | Self::StalePiece => 409,
            Self::InvalidPlacement => 422,
            Self::MalformedIntent => 400,
            Self::RoomUnavailable => 503,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NameConflict => "name_conflict",
            Self::InvalidPlacement => "invalid_placement",
            Self::MalformedIntent => "malformed_intent",
            Self::StalePiece => "stale_piece",
            Self::RoomUnavailable => "room_unavailable",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// ClientMessage — client → room
// ---------------------------------------------------------------------------

/// Intents a client may send once connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Rotate the shared offered piece 90° clockwise. `shape` is the
    /// orientation the client currently holds; `generation`, when sent,
    /// names the offered piece the client believes it holds.
    RotatePiece {
        shape: Shape,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generation: Option<u64>,
    },

    /// Place a piece with its top-left corner at `position`.
    PlacePiece {
        shape: Shape,
        position: Position,
        color: String,
    },

    /// Leave the room for good: the player entry is removed, not just
    /// marked disconnected.
    LeaveRoom,
}

// ---------------------------------------------------------------------------
// ServerMessage — room → client
// ---------------------------------------------------------------------------

/// Messages the room sends to its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full resync, sent to a player when they join.
    GameState {
        grid: Grid,
        players: PlayerMap,
        score: u64,
        next_piece: Piece,
        generation: u64,
        player_name: PlayerName,
        player_color: String,
    },

    /// Someone joined (or rejoined). Sent to everyone else.
    PlayerJoined {
        player_name: PlayerName,
        players: PlayerMap,
    },

    /// Someone disconnected or left. Sent to everyone else.
    PlayerLeft {
        player_name: PlayerName,
        players: PlayerMap,
    },

    /// A placement was committed. Sent to every connected member.
    PiecePlaced {
        grid: Grid,
        score: u64,
        next_piece: Piece,
        generation: u64,
        placed_by: PlayerName,
    },

    /// The offered piece was rotated. Sent to every connected member.
    PieceRotated {
        shape: Shape,
        generation: u64,
        rotated_by: PlayerName,
    },

    /// The last commit filled every cell of the grid.
    GridFull { score: u64 },

    /// An intent from this client was rejected.
    Error {
        code: u16,
        kind: ErrorKind,
        message: String,
    },
}

impl ServerMessage {
    /// Builds an `Error` message with the kind's status code.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            code: kind.code(),
            kind,
            message: message.into(),
        }
    }

    /// The wire tag of this message, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::GameState { .. } => "game_state",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::PiecePlaced { .. } => "piece_placed",
            Self::PieceRotated { .. } => "piece_rotated",
            Self::GridFull { .. } => "grid_full",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client parses these exact JSON shapes, so the tests
    //! pin the serde attributes down.

    use boxfit_game::{GRID_SIZE, PieceKind, ShapeError};

    use super::*;

    fn name(s: &str) -> PlayerName {
        PlayerName::new(s)
    }

    #[test]
    fn test_player_name_serializes_as_plain_string() {
        let json = serde_json::to_string(&name("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId::new("lobby").to_string(), "lobby");
    }

    #[test]
    fn test_position_is_on_grid() {
        assert!(Position { x: 0, y: 0 }.is_on_grid());
        assert!(Position { x: 9, y: 9 }.is_on_grid());
        assert!(!Position { x: 10, y: 0 }.is_on_grid());
        assert!(!Position { x: 0, y: -1 }.is_on_grid());
    }

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(ErrorKind::NameConflict.code(), 409);
        assert_eq!(ErrorKind::InvalidPlacement.code(), 422);
        assert_eq!(ErrorKind::MalformedIntent.code(), 400);
        assert_eq!(ErrorKind::RoomUnavailable.code(), 503);
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_decode_place_piece() {
        let json = r##"{
            "type": "place_piece",
            "data": {
                "shape": [[1, 1], [1, 1]],
                "position": {"x": 0, "y": 0},
                "color": "#FFFF00"
            }
        }"##;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlacePiece {
                shape: PieceKind::O.shape(),
                position: Position { x: 0, y: 0 },
                color: "#FFFF00".into(),
            }
        );
    }

    #[test]
    fn test_decode_rotate_piece_without_generation() {
        let json = r#"{"type": "rotate_piece", "data": {"shape": [[1, 1, 1, 1]]}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::RotatePiece {
                shape: PieceKind::I.shape(),
                generation: None,
            }
        );
    }

    #[test]
    fn test_decode_rotate_piece_with_generation() {
        let json = r#"{"type": "rotate_piece", "data": {"shape": [[1, 1, 1, 1]], "generation": 3}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::RotatePiece { generation: Some(3), .. }
        ));
    }

    #[test]
    fn test_decode_leave_room_without_data() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "leave_room"}"#).unwrap();
        assert_eq!(msg, ClientMessage::LeaveRoom);
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type": "clear_grid", "data": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_place_piece_missing_position_fails() {
        let json = r##"{"type": "place_piece", "data": {"shape": [[1]], "color": "#fff"}}"##;
        let result: Result<ClientMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_ragged_shape_fails_with_shape_error_text() {
        let json = r##"{
            "type": "place_piece",
            "data": {
                "shape": [[1, 1, 1], [1]],
                "position": {"x": 0, "y": 0},
                "color": "#800080"
            }
        }"##;
        let err = serde_json::from_str::<ClientMessage>(json)
            .unwrap_err()
            .to_string();
        let expected = ShapeError::Ragged {
            row: 1,
            expected: 3,
            found: 1,
        }
        .to_string();
        assert!(err.contains(&expected), "unexpected error: {err}");
    }

    #[test]
    fn test_decode_non_binary_shape_fails() {
        let json = r##"{"type": "rotate_piece", "data": {"shape": [[1, 7]]}}"##;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    // =====================================================================
    // ServerMessage
    // =====================================================================

    #[test]
    fn test_game_state_json_format() {
        let mut players = PlayerMap::new();
        players.insert(
            name("alice"),
            PlayerInfo {
                color: "#3B82F6".into(),
                connected: true,
            },
        );
        let msg = ServerMessage::GameState {
            grid: Grid::new(),
            players,
            score: 0,
            next_piece: Piece::new(PieceKind::O),
            generation: 1,
            player_name: name("alice"),
            player_color: "#3B82F6".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "game_state");
        let data = &json["data"];
        assert_eq!(data["grid"].as_array().unwrap().len(), GRID_SIZE);
        assert_eq!(data["players"]["alice"]["color"], "#3B82F6");
        assert_eq!(data["players"]["alice"]["connected"], true);
        assert_eq!(data["score"], 0);
        assert_eq!(data["next_piece"]["type"], "O");
        assert_eq!(data["player_name"], "alice");
        assert_eq!(data["player_color"], "#3B82F6");
    }

    #[test]
    fn test_piece_placed_json_format() {
        let msg = ServerMessage::PiecePlaced {
            grid: Grid::new(),
            score: 4,
            next_piece: Piece::new(PieceKind::I),
            generation: 2,
            placed_by: name("bob"),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "piece_placed");
        assert_eq!(json["data"]["score"], 4);
        assert_eq!(json["data"]["next_piece"]["shape"], serde_json::json!([[1, 1, 1, 1]]));
        assert_eq!(json["data"]["placed_by"], "bob");
        assert_eq!(json["data"]["generation"], 2);
    }

    #[test]
    fn test_piece_rotated_json_format() {
        let msg = ServerMessage::PieceRotated {
            shape: PieceKind::I.shape().rotated(),
            generation: 5,
            rotated_by: name("carol"),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "piece_rotated");
        assert_eq!(json["data"]["shape"], serde_json::json!([[1], [1], [1], [1]]));
    }

    #[test]
    fn test_error_json_format() {
        let msg = ServerMessage::error(ErrorKind::InvalidPlacement, "cell (0, 10) is outside the grid");
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["data"]["code"], 422);
        assert_eq!(json["data"]["kind"], "invalid_placement");
        assert_eq!(msg.kind_name(), "error");
    }

    #[test]
    fn test_player_map_is_sorted_by_name() {
        let mut players = PlayerMap::new();
        for n in ["zoe", "adam", "mia"] {
            players.insert(
                name(n),
                PlayerInfo {
                    color: "#000000".into(),
                    connected: false,
                },
            );
        }
        let msg = ServerMessage::PlayerLeft {
            player_name: name("mia"),
            players,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let adam = json.find("adam").unwrap();
        let mia = json.find("\"mia\":").unwrap();
        let zoe = json.find("zoe").unwrap();
        assert!(adam < mia && mia < zoe);
    }
}
