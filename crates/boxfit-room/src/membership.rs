//! Membership: the players a room knows about and how to reach them.
//!
//! A member is keyed by name and lives in one of two states:
//!
//! ```text
//!   Connected ──(channel closed)──→ Disconnected
//!       ↑                               │
//!       └───────────(rejoin)────────────┘
//! ```
//!
//! A disconnected member keeps its color and shows up in the player map
//! with `connected: false`. An explicit leave removes the member instead.
//! The connection handle exists only in the `Connected` state and is
//! replaced together with its [`ConnectionId`] on rejoin, so a handler
//! whose connection was superseded can neither receive frames nor
//! disconnect the player.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use boxfit_protocol::{PlayerInfo, PlayerMap, PlayerName, RoomId};
use boxfit_transport::ConnectionId;

use crate::config::DEFAULT_PALETTE;
use crate::{PlayerSender, RoomError};

/// A member's connection state.
#[derive(Debug)]
pub(crate) enum Presence {
    Connected {
        connection: ConnectionId,
        sender: PlayerSender,
    },
    Disconnected {
        since: Instant,
    },
}

#[derive(Debug)]
struct Member {
    color: String,
    presence: Presence,
}

impl Member {
    fn is_connected(&self) -> bool {
        matches!(self.presence, Presence::Connected { .. })
    }

    fn is_bound_to(&self, connection: ConnectionId) -> bool {
        matches!(
            self.presence,
            Presence::Connected { connection: current, .. } if current == connection
        )
    }
}

/// The result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReceipt {
    /// The player's color; unchanged from before on a rejoin.
    pub color: String,
    /// `true` if the player was already known to the room.
    pub rejoined: bool,
    /// How long the player had been away, for a rejoin.
    pub away_for: Option<Duration>,
}

/// The player table of one room.
#[derive(Debug)]
pub(crate) struct Membership {
    room_id: RoomId,
    members: BTreeMap<PlayerName, Member>,
    palette: Vec<String>,
    /// Count of first-time joins; picks the next palette color.
    joins: usize,
}

impl Membership {
    pub(crate) fn new(room_id: RoomId, palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self {
            room_id,
            members: BTreeMap::new(),
            palette,
            joins: 0,
        }
    }

    /// Adds a new member or reactivates a disconnected one.
    ///
    /// # Errors
    /// Returns [`RoomError::NameConflict`] if `name` is connected. The
    /// table is left untouched in that case.
    pub(crate) fn join(
        &mut self,
        name: &PlayerName,
        connection: ConnectionId,
        sender: PlayerSender,
    ) -> Result<JoinReceipt, RoomError> {
        let presence = Presence::Connected { connection, sender };

        if let Some(member) = self.members.get_mut(name) {
            let away_for = match &member.presence {
                Presence::Connected { .. } => {
                    return Err(RoomError::NameConflict {
                        room: self.room_id.clone(),
                        player: name.clone(),
                    });
                }
                Presence::Disconnected { since } => since.elapsed(),
            };
            member.presence = presence;
            return Ok(JoinReceipt {
                color: member.color.clone(),
                rejoined: true,
                away_for: Some(away_for),
            });
        }

        let color = self.palette[self.joins % self.palette.len()].clone();
        self.joins += 1;
        self.members.insert(
            name.clone(),
            Member {
                color: color.clone(),
                presence,
            },
        );
        Ok(JoinReceipt {
            color,
            rejoined: false,
            away_for: None,
        })
    }

    /// Marks a member disconnected if `connection` is still its current
    /// one. Returns `true` if the state changed.
    pub(crate) fn disconnect(
        &mut self,
        name: &PlayerName,
        connection: ConnectionId,
    ) -> bool {
        match self.members.get_mut(name) {
            Some(member) if member.is_bound_to(connection) => {
                member.presence = Presence::Disconnected {
                    since: Instant::now(),
                };
                true
            }
            _ => false,
        }
    }

    /// Removes a member if `connection` is still its current one.
    /// Returns `true` if the member was removed.
    pub(crate) fn remove(
        &mut self,
        name: &PlayerName,
        connection: ConnectionId,
    ) -> bool {
        let bound = self
            .members
            .get(name)
            .is_some_and(|member| member.is_bound_to(connection));
        if bound {
            self.members.remove(name);
        }
        bound
    }

    /// Checks that `connection` is the live connection for `name`.
    ///
    /// # Errors
    /// Returns [`RoomError::NotInRoom`] otherwise.
    pub(crate) fn ensure_bound(
        &self,
        name: &PlayerName,
        connection: ConnectionId,
    ) -> Result<(), RoomError> {
        match self.members.get(name) {
            Some(member) if member.is_bound_to(connection) => Ok(()),
            _ => Err(RoomError::NotInRoom(name.clone())),
        }
    }

    /// Connected members and their channels, in name order.
    pub(crate) fn connected(
        &self,
    ) -> impl Iterator<Item = (&PlayerName, &PlayerSender)> {
        self.members
            .iter()
            .filter_map(|(name, member)| match &member.presence {
                Presence::Connected { sender, .. } => Some((name, sender)),
                Presence::Disconnected { .. } => None,
            })
    }

    pub(crate) fn connected_count(&self) -> usize {
        self.members.values().filter(|m| m.is_connected()).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    /// The player map as every member sees it.
    pub(crate) fn player_map(&self) -> PlayerMap {
        self.members
            .iter()
            .map(|(name, member)| {
                (
                    name.clone(),
                    PlayerInfo {
                        color: member.color.clone(),
                        connected: member.is_connected(),
                    },
                )
            })
            .collect()
    }
}
