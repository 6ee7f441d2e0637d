//! Error types for the room layer.

use boxfit_game::PlacementError;
use boxfit_protocol::{ErrorKind, PlayerName, RoomId, ServerMessage};

/// Why a room refused a join or an intent.
///
/// Every variant except [`NotInRoom`](Self::NotInRoom) is reported back to
/// the requester as an `error` message; see [`RoomError::kind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// A connected player already uses this name.
    #[error("player {player} is already connected to room {room}")]
    NameConflict { room: RoomId, player: PlayerName },

    /// The piece would leave the grid or overlap a filled cell.
    #[error("invalid placement: {0}")]
    InvalidPlacement(#[from] PlacementError),

    /// The intent is well-formed JSON but describes something impossible.
    #[error("malformed intent: {0}")]
    MalformedIntent(String),

    /// The rotation refers to an offered piece that has been replaced.
    #[error("offered piece has moved on (current generation {current})")]
    StalePiece { current: u64 },

    /// The sender's connection is not the one the room knows for that
    /// player (it was superseded, or the player left).
    #[error("player {0} is not connected to this room")]
    NotInRoom(PlayerName),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// The wire category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NameConflict { .. } => ErrorKind::NameConflict,
            Self::InvalidPlacement(_) => ErrorKind::InvalidPlacement,
            Self::MalformedIntent(_) => ErrorKind::MalformedIntent,
            Self::StalePiece { .. } => ErrorKind::StalePiece,
            Self::NotInRoom(_) | Self::Unavailable(_) => ErrorKind::RoomUnavailable,
        }
    }

    /// The `error` message sent to the requester.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::error(self.kind(), self.to_string())
    }
}
