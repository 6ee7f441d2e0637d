//! Per-connection handler: route, join, and intent forwarding.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Parse the request path → room id and player name
//!   2. Join the room → `game_state` arrives through the player channel
//!   3. Spawn a writer that drains the player channel into the socket
//!   4. Loop: receive intents → forward to the room actor, pinging the
//!      peer on a heartbeat and dropping it once it stops answering

use std::sync::Arc;
use std::time::Duration;

use boxfit_protocol::{
    ClientMessage, Codec, ConnectTarget, ErrorKind, PlayerName, ServerMessage,
};
use boxfit_room::{Frame, PlayerSender, RoomError, RoomHandle};
use boxfit_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::BoxfitError;
use crate::server::ServerState;

/// How long the writer may keep flushing after the reader stops.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Heartbeat periods a peer may stay silent before it is dropped.
const MISSED_BEATS: u32 = 2;

/// Drop guard that marks the player disconnected when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the room call.
struct DisconnectGuard {
    room: RoomHandle,
    player: PlayerName,
    connection: ConnectionId,
    armed: bool,
}

impl DisconnectGuard {
    /// The player left explicitly; nothing to do on drop.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let room = self.room.clone();
        let player = self.player.clone();
        let connection = self.connection;
        tokio::spawn(async move {
            let _ = room.disconnect(player, connection).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), BoxfitError> {
    let conn = Arc::new(conn);
    let connection = conn.id();

    // --- Step 1: Route ---
    let ConnectTarget {
        room_id,
        player_name: player,
    } = match ConnectTarget::parse(conn.path(), &state.path_prefix) {
        Ok(target) => target,
        Err(e) => {
            tracing::debug!(%connection, path = conn.path(), error = %e, "bad connect path");
            refuse(&conn, &state, ErrorKind::MalformedIntent, &e.to_string()).await?;
            return Err(e.into());
        }
    };

    // --- Step 2: Join ---
    let (tx, rx) = mpsc::unbounded_channel::<Frame>();
    let (room, receipt) = match state
        .rooms
        .join(room_id.clone(), player.clone(), connection, tx.clone())
        .await
    {
        Ok(joined) => joined,
        Err(e) => {
            refuse(&conn, &state, e.kind(), &e.to_string()).await?;
            return Err(e.into());
        }
    };

    tracing::info!(
        %room_id,
        %player,
        %connection,
        color = %receipt.color,
        rejoined = receipt.rejoined,
        "player connected"
    );

    let mut guard = DisconnectGuard {
        room: room.clone(),
        player: player.clone(),
        connection,
        armed: true,
    };

    // --- Step 3: Writer ---
    let writer = tokio::spawn(write_frames(Arc::clone(&conn), rx));

    // --- Step 4: Intent loop ---
    let mut heartbeat = state
        .heartbeat_interval
        .filter(|period| !period.is_zero())
        .map(Heartbeat::new);
    let mut last_intent = Instant::now();
    loop {
        let idle_deadline = state.idle_timeout.map(|limit| last_intent + limit);
        let received = tokio::select! {
            received = conn.recv() => received,
            () = sleep_until(idle_deadline) => {
                tracing::info!(%room_id, %player, "connection idle, closing");
                break;
            }
            period = next_beat(&mut heartbeat) => {
                if conn.idle_for() >= period * MISSED_BEATS {
                    tracing::info!(%room_id, %player, "connection unresponsive, closing");
                    break;
                }
                if let Err(e) = conn.ping().await {
                    tracing::debug!(%room_id, %player, error = %e, "ping failed");
                    break;
                }
                continue;
            }
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%room_id, %player, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%room_id, %player, error = %e, "recv error");
                break;
            }
        };
        last_intent = Instant::now();

        let intent: ClientMessage = match state.codec.decode(&data) {
            Ok(intent) => intent,
            Err(e) => {
                tracing::debug!(%room_id, %player, error = %e, "undecodable intent");
                push_error(&tx, &state, ErrorKind::MalformedIntent, &e.to_string());
                continue;
            }
        };

        let result = match intent {
            ClientMessage::RotatePiece { shape, generation } => room
                .rotate(player.clone(), connection, shape, generation)
                .await
                .map(|_| ()),
            ClientMessage::PlacePiece {
                shape,
                position,
                color,
            } => room
                .place(player.clone(), connection, shape, position, color)
                .await
                .map(|_| ()),
            ClientMessage::LeaveRoom => {
                let _ = room.leave(player.clone(), connection).await;
                guard.disarm();
                tracing::info!(%room_id, %player, "player left the room");
                break;
            }
        };

        // The room already told the player about rule rejections; only a
        // room that is gone or no longer knows this connection ends it.
        match result {
            Err(e @ RoomError::Unavailable(_)) => {
                push_error(&tx, &state, e.kind(), &e.to_string());
                break;
            }
            Err(RoomError::NotInRoom(_)) => {
                tracing::info!(%room_id, %player, %connection, "connection superseded");
                break;
            }
            _ => {}
        }
    }

    drop(guard);
    drop(tx);
    let _ = tokio::time::timeout(FLUSH_TIMEOUT, writer).await;
    let _ = conn.close().await;
    Ok(())
}

/// Periodic ping schedule for one connection.
struct Heartbeat {
    period: Duration,
    ticker: Interval,
}

impl Heartbeat {
    fn new(period: Duration) -> Self {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { period, ticker }
    }
}

/// Resolves to the period on each tick; never resolves without a heartbeat.
async fn next_beat(heartbeat: &mut Option<Heartbeat>) -> Duration {
    match heartbeat {
        Some(beat) => {
            beat.ticker.tick().await;
            beat.period
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Forwards frames from the player channel to the socket until the
/// channel closes or the peer goes away.
async fn write_frames(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<Frame>,
) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(connection = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Queues an `error` message behind any frames already waiting.
fn push_error(
    tx: &PlayerSender,
    state: &ServerState,
    kind: ErrorKind,
    message: &str,
) {
    match state.codec.encode(&ServerMessage::error(kind, message)) {
        Ok(bytes) => {
            let _ = tx.send(Frame::from(bytes));
        }
        Err(e) => tracing::warn!(error = %e, "failed to encode error message"),
    }
}

/// Sends an `error` message straight to a connection that never joined,
/// then closes it.
async fn refuse(
    conn: &WebSocketConnection,
    state: &ServerState,
    kind: ErrorKind,
    message: &str,
) -> Result<(), BoxfitError> {
    let bytes = state.codec.encode(&ServerMessage::error(kind, message))?;
    conn.send(&bytes).await?;
    let _ = conn.close().await;
    Ok(())
}
