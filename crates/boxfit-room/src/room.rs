//! Room actor: an isolated Tokio task that owns one game.
//!
//! Each room runs in its own task and talks to the outside world only
//! through an mpsc mailbox. The actor handles one command at a time, so
//! every join, leave, rotation and placement in a room happens in a
//! single total order against one grid. Nothing about a room is behind a
//! lock.

use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use boxfit_game::{
    GRID_SIZE, Grid, Occupant, Piece, PieceGenerator, PieceKind, Shape,
};
use boxfit_protocol::{PlayerMap, PlayerName, Position, RoomId, ServerMessage};
use boxfit_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::dispatch::{Dispatcher, Recipient};
use crate::membership::{JoinReceipt, Membership};
use crate::registry::RoomTable;
use crate::{PlayerSender, RoomConfig, RoomError, RoomPhase};

/// Counter for telling successive rooms with the same id apart.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Commands sent to a room actor through its mailbox.
///
/// The `oneshot::Sender` in most variants is a reply channel: the caller
/// sends a command and waits for the outcome on it.
pub(crate) enum RoomCommand {
    /// Add or reactivate a player.
    Join {
        player: PlayerName,
        connection: ConnectionId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<JoinReceipt, RoomError>>,
    },

    /// The player's channel closed: mark them disconnected.
    Disconnect {
        player: PlayerName,
        connection: ConnectionId,
        reply: oneshot::Sender<()>,
    },

    /// The player asked to leave: remove them.
    Leave {
        player: PlayerName,
        connection: ConnectionId,
        reply: oneshot::Sender<()>,
    },

    /// Rotate the offered piece.
    Rotate {
        player: PlayerName,
        connection: ConnectionId,
        shape: Shape,
        generation: Option<u64>,
        reply: oneshot::Sender<Result<Shape, RoomError>>,
    },

    /// Commit a placement.
    Place {
        player: PlayerName,
        connection: ConnectionId,
        shape: Shape,
        position: Position,
        color: String,
        reply: oneshot::Sender<Result<PlacementReceipt, RoomError>>,
    },

    /// Request room metadata.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Request a copy of the full game state.
    Snapshot { reply: oneshot::Sender<RoomSnapshot> },

    /// Shut down the room.
    Shutdown,
}

/// The outcome of a committed placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementReceipt {
    /// Cells filled by this piece.
    pub cells: usize,
    /// Room score after the commit.
    pub score: u64,
    /// Generation of the newly offered piece.
    pub generation: u64,
    /// `true` if this commit filled the grid.
    pub grid_full: bool,
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: RoomPhase,
    /// Members known to the room, connected or not.
    pub player_count: usize,
    pub connected_count: usize,
    pub score: u64,
    pub generation: u64,
}

/// A copy of a room's full game state.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub grid: Grid,
    pub players: PlayerMap,
    pub score: u64,
    pub offered: Piece,
    pub generation: u64,
    pub phase: RoomPhase,
}

/// Handle to a running room actor.
///
/// Cheap to clone. A connection handler keeps its own copy from the
/// moment it joins, so intents never go through the registry.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Join { .. } => "Join",
            Self::Disconnect { .. } => "Disconnect",
            Self::Leave { .. } => "Leave",
            Self::Rotate { .. } => "Rotate",
            Self::Place { .. } => "Place",
            Self::Info { .. } => "Info",
            Self::Snapshot { .. } => "Snapshot",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl RoomHandle {
    /// Returns the room's id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Identifies this particular actor. A room retired and recreated
    /// under the same id gets a new instance.
    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Sends a join request. On success the player receives `game_state`
    /// through `sender` and everyone else receives `player_joined`.
    pub async fn join(
        &self,
        player: PlayerName,
        connection: ConnectionId,
        sender: PlayerSender,
    ) -> Result<JoinReceipt, RoomError> {
        self.request(|reply| RoomCommand::Join {
            player,
            connection,
            sender,
            reply,
        })
        .await?
    }

    /// Reports that a player's channel closed.
    pub async fn disconnect(
        &self,
        player: PlayerName,
        connection: ConnectionId,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Disconnect {
            player,
            connection,
            reply,
        })
        .await
    }

    /// Removes a player from the room.
    pub async fn leave(
        &self,
        player: PlayerName,
        connection: ConnectionId,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave {
            player,
            connection,
            reply,
        })
        .await
    }

    /// Rotates the offered piece 90° clockwise, starting from `shape`.
    /// Returns the new orientation.
    pub async fn rotate(
        &self,
        player: PlayerName,
        connection: ConnectionId,
        shape: Shape,
        generation: Option<u64>,
    ) -> Result<Shape, RoomError> {
        self.request(|reply| RoomCommand::Rotate {
            player,
            connection,
            shape,
            generation,
            reply,
        })
        .await?
    }

    /// Commits `shape` with its top-left corner at `position`.
    pub async fn place(
        &self,
        player: PlayerName,
        connection: ConnectionId,
        shape: Shape,
        position: Position,
        color: String,
    ) -> Result<PlacementReceipt, RoomError> {
        self.request(|reply| RoomCommand::Place {
            player,
            connection,
            shape,
            position,
            color,
            reply,
        })
        .await?
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Requests a copy of the game state.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    instance: u64,
    config: RoomConfig,
    grid: Grid,
    score: u64,
    offered: Piece,
    /// Bumped every time a new piece is offered.
    generation: u64,
    phase: RoomPhase,
    generator: PieceGenerator,
    members: Membership,
    dispatch: Dispatcher,
    receiver: mpsc::Receiver<RoomCommand>,
    registry: Weak<RoomTable>,
    /// Set while no player is connected.
    retire_at: Option<Instant>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown or retirement.
    async fn run(mut self) {
        tracing::info!(
            room_id = %self.room_id,
            instance = self.instance,
            "room actor started"
        );

        loop {
            let cmd = tokio::select! {
                // Queued commands win over the retire timer, so a join
                // already in the mailbox keeps the room alive.
                biased;
                cmd = self.receiver.recv() => cmd,
                () = retire_timer(self.retire_at) => {
                    tracing::info!(room_id = %self.room_id, "room retiring, no connected players");
                    break;
                }
            };
            let Some(cmd) = cmd else { break };
            if !self.handle(cmd) {
                tracing::info!(room_id = %self.room_id, "room shutting down");
                break;
            }
        }

        self.receiver.close();
        self.deregister().await;
        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Handles one command. Returns `false` to stop the actor.
    fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player,
                connection,
                sender,
                reply,
            } => {
                let result = self.handle_join(player, connection, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect {
                player,
                connection,
                reply,
            } => {
                self.handle_disconnect(&player, connection, false);
                let _ = reply.send(());
            }
            RoomCommand::Leave {
                player,
                connection,
                reply,
            } => {
                self.handle_disconnect(&player, connection, true);
                let _ = reply.send(());
            }
            RoomCommand::Rotate {
                player,
                connection,
                shape,
                generation,
                reply,
            } => {
                let result =
                    self.handle_rotate(&player, connection, shape, generation);
                let _ = reply.send(self.report(&player, result));
            }
            RoomCommand::Place {
                player,
                connection,
                shape,
                position,
                color,
                reply,
            } => {
                let result = self
                    .handle_place(&player, connection, &shape, position, &color);
                let _ = reply.send(self.report(&player, result));
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::Shutdown => return false,
        }
        true
    }

    fn handle_join(
        &mut self,
        player: PlayerName,
        connection: ConnectionId,
        sender: PlayerSender,
    ) -> Result<JoinReceipt, RoomError> {
        let receipt = match self.members.join(&player, connection, sender) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::info!(room_id = %self.room_id, %player, "join refused: name in use");
                return Err(e);
            }
        };
        self.retire_at = None;

        tracing::info!(
            room_id = %self.room_id,
            %player,
            %connection,
            color = %receipt.color,
            rejoined = receipt.rejoined,
            connected = self.members.connected_count(),
            "player joined"
        );

        let state = ServerMessage::GameState {
            grid: self.grid.clone(),
            players: self.members.player_map(),
            score: self.score,
            next_piece: self.offered.clone(),
            generation: self.generation,
            player_name: player.clone(),
            player_color: receipt.color.clone(),
        };
        self.dispatch
            .send(&self.members, Recipient::Player(&player), &state);

        let joined = ServerMessage::PlayerJoined {
            player_name: player.clone(),
            players: self.members.player_map(),
        };
        self.dispatch
            .send(&self.members, Recipient::AllExcept(&player), &joined);

        Ok(receipt)
    }

    /// Marks the player disconnected, or removes them when `remove` is
    /// set. Does nothing if `connection` was superseded.
    fn handle_disconnect(
        &mut self,
        player: &PlayerName,
        connection: ConnectionId,
        remove: bool,
    ) {
        let changed = if remove {
            self.members.remove(player, connection)
        } else {
            self.members.disconnect(player, connection)
        };
        if !changed {
            tracing::debug!(
                room_id = %self.room_id,
                %player,
                %connection,
                "ignoring leave from superseded connection"
            );
            return;
        }

        let connected = self.members.connected_count();
        tracing::info!(
            room_id = %self.room_id,
            %player,
            removed = remove,
            connected,
            "player left"
        );

        let left = ServerMessage::PlayerLeft {
            player_name: player.clone(),
            players: self.members.player_map(),
        };
        self.dispatch
            .send(&self.members, Recipient::AllExcept(player), &left);

        if connected == 0 {
            self.retire_at = Some(Instant::now() + self.config.retire_grace);
            tracing::info!(
                room_id = %self.room_id,
                grace = ?self.config.retire_grace,
                "last player gone, retire timer started"
            );
        }
    }

    fn handle_rotate(
        &mut self,
        player: &PlayerName,
        connection: ConnectionId,
        shape: Shape,
        generation: Option<u64>,
    ) -> Result<Shape, RoomError> {
        self.members.ensure_bound(player, connection)?;
        let kind = identify(&shape)?;

        let stale_generation = generation.is_some_and(|g| g != self.generation);
        if stale_generation || kind != self.offered.kind {
            return Err(RoomError::StalePiece {
                current: self.generation,
            });
        }

        let rotated = shape.rotated();
        self.offered.shape = rotated.clone();
        tracing::debug!(
            room_id = %self.room_id,
            %player,
            %kind,
            generation = self.generation,
            "piece rotated"
        );

        let msg = ServerMessage::PieceRotated {
            shape: rotated.clone(),
            generation: self.generation,
            rotated_by: player.clone(),
        };
        self.dispatch.send(&self.members, Recipient::All, &msg);
        Ok(rotated)
    }

    fn handle_place(
        &mut self,
        player: &PlayerName,
        connection: ConnectionId,
        shape: &Shape,
        position: Position,
        color: &str,
    ) -> Result<PlacementReceipt, RoomError> {
        self.members.ensure_bound(player, connection)?;
        if !position.is_on_grid() {
            return Err(RoomError::MalformedIntent(format!(
                "position ({}, {}) is outside 0..{GRID_SIZE}",
                position.x, position.y
            )));
        }
        let kind = identify(shape)?;
        if color != kind.color() {
            return Err(RoomError::MalformedIntent(format!(
                "color {color} does not match piece {kind} ({})",
                kind.color()
            )));
        }

        let occupant = Occupant {
            color: kind.color().to_string(),
            player: player.to_string(),
        };
        // x is the column, y the row.
        let cells = self.grid.commit(shape, position.y, position.x, &occupant)?;

        let points = (cells as u64).saturating_mul(self.config.points_per_cell);
        self.score = self.score.saturating_add(points);
        self.offered = self.generator.next_piece();
        self.generation += 1;

        tracing::debug!(
            room_id = %self.room_id,
            %player,
            %kind,
            x = position.x,
            y = position.y,
            score = self.score,
            next = %self.offered.kind,
            "piece placed"
        );

        let placed = ServerMessage::PiecePlaced {
            grid: self.grid.clone(),
            score: self.score,
            next_piece: self.offered.clone(),
            generation: self.generation,
            placed_by: player.clone(),
        };
        self.dispatch.send(&self.members, Recipient::All, &placed);

        let grid_full = self.grid.is_full();
        if grid_full && !self.phase.is_full() {
            self.phase = RoomPhase::Full;
            tracing::info!(room_id = %self.room_id, score = self.score, "grid full");
            let full = ServerMessage::GridFull { score: self.score };
            self.dispatch.send(&self.members, Recipient::All, &full);
        }

        Ok(PlacementReceipt {
            cells,
            score: self.score,
            generation: self.generation,
            grid_full,
        })
    }

    /// Sends a rejection to the requester only. A requester whose
    /// connection was superseded has no channel to receive it.
    fn report<T>(
        &self,
        player: &PlayerName,
        result: Result<T, RoomError>,
    ) -> Result<T, RoomError> {
        if let Err(e) = &result {
            tracing::debug!(
                room_id = %self.room_id,
                %player,
                kind = %e.kind(),
                error = %e,
                "intent rejected"
            );
            if !matches!(e, RoomError::NotInRoom(_)) {
                self.dispatch.send(
                    &self.members,
                    Recipient::Player(player),
                    &e.to_message(),
                );
            }
        }
        result
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            phase: self.phase,
            player_count: self.members.len(),
            connected_count: self.members.connected_count(),
            score: self.score,
            generation: self.generation,
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            grid: self.grid.clone(),
            players: self.members.player_map(),
            score: self.score,
            offered: self.offered.clone(),
            generation: self.generation,
            phase: self.phase,
        }
    }

    /// Removes this room from the registry, unless the entry there
    /// already belongs to a newer instance.
    async fn deregister(&self) {
        let Some(rooms) = self.registry.upgrade() else {
            return;
        };
        let mut rooms = rooms.lock().await;
        let ours = rooms
            .get(&self.room_id)
            .is_some_and(|handle| handle.instance() == self.instance);
        if ours {
            rooms.remove(&self.room_id);
            tracing::info!(room_id = %self.room_id, "room removed from registry");
        }
    }
}

/// Resolves a submitted shape to its catalog type.
fn identify(shape: &Shape) -> Result<PieceKind, RoomError> {
    PieceKind::identify(shape).ok_or_else(|| {
        RoomError::MalformedIntent(
            "shape does not match any catalog piece".to_string(),
        )
    })
}

/// Completes at `deadline`, or never if there is none.
async fn retire_timer(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// The retire timer only starts once the last connected player goes, so
/// the join that created the room always gets through.
pub(crate) fn spawn_room(
    room_id: RoomId,
    config: RoomConfig,
    registry: Weak<RoomTable>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);

    let mut generator = match config.piece_seed {
        Some(seed) => PieceGenerator::seeded(seed),
        None => PieceGenerator::from_entropy(),
    };
    let offered = generator.next_piece();

    let actor = RoomActor {
        room_id: room_id.clone(),
        instance,
        grid: Grid::new(),
        score: 0,
        offered,
        generation: 1,
        phase: RoomPhase::Filling,
        generator,
        members: Membership::new(room_id.clone(), config.palette.clone()),
        dispatch: Dispatcher::new(room_id.clone()),
        receiver: rx,
        registry,
        retire_at: None,
        config,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        instance,
        sender: tx,
    }
}
