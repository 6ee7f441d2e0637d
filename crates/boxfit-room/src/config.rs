//! Room configuration and phase.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Player colors, handed out in join order and reused cyclically.
pub const DEFAULT_PALETTE: [&str; 6] = [
    "#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6", "#EC4899",
];

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room a registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How long a room with no connected players stays alive before it
    /// retires. Zero retires it as soon as the last player goes.
    pub retire_grace: Duration,

    /// Score awarded per filled cell of a committed piece.
    pub points_per_cell: u64,

    /// Seed for the piece generator. `None` draws from OS entropy.
    pub piece_seed: Option<u64>,

    /// Capacity of the room's command mailbox.
    pub channel_size: usize,

    /// Colors assigned to players. Falls back to [`DEFAULT_PALETTE`]
    /// when empty.
    pub palette: Vec<String>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            retire_grace: Duration::from_secs(30),
            points_per_cell: 1,
            piece_seed: None,
            channel_size: 64,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room's game stands.
///
/// ```text
/// Filling ──(commit fills the last cell)──→ Full
/// ```
///
/// A `Full` room still accepts joins and rotations; every placement is
/// refused by the validator because no cell is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    Filling,
    Full,
}

impl RoomPhase {
    /// Returns `true` once the grid has no free cell left.
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filling => write!(f, "Filling"),
            Self::Full => write!(f, "Full"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_phase_is_full() {
        assert!(!RoomPhase::Filling.is_full());
        assert!(RoomPhase::Full.is_full());
    }

    #[test]
    fn test_room_phase_display() {
        assert_eq!(RoomPhase::Filling.to_string(), "Filling");
        assert_eq!(RoomPhase::Full.to_string(), "Full");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.retire_grace, Duration::from_secs(30));
        assert_eq!(config.points_per_cell, 1);
        assert_eq!(config.piece_seed, None);
        assert_eq!(config.palette.len(), 6);
        assert_eq!(config.palette[0], "#3B82F6");
    }
}
