//! Room registry: creates rooms on first join and forgets them once they
//! retire.

use std::collections::HashMap;
use std::sync::Arc;

use boxfit_protocol::{PlayerName, RoomId};
use boxfit_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{JoinReceipt, PlayerSender, RoomConfig, RoomError, RoomHandle};

/// The shared room table. Room actors hold a weak reference to it so
/// they can remove themselves when they retire.
pub(crate) type RoomTable = Mutex<HashMap<RoomId, RoomHandle>>;

/// How many times a join is retried against a room that retired between
/// lookup and delivery.
const JOIN_ATTEMPTS: usize = 3;

/// Tracks every live room by id.
///
/// Cheap to clone; clones share the same table. The table lock is held
/// only to look up or insert a handle, never while talking to a room.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RoomTable>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry. Every room it creates uses `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// The config new rooms are created with.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Joins `player` to `room_id`, creating the room if it does not
    /// exist. Returns the room's handle for all further intents.
    ///
    /// # Errors
    /// - [`RoomError::NameConflict`] if the name is connected in that room.
    /// - [`RoomError::Unavailable`] if no live room could be reached.
    pub async fn join(
        &self,
        room_id: RoomId,
        player: PlayerName,
        connection: ConnectionId,
        sender: PlayerSender,
    ) -> Result<(RoomHandle, JoinReceipt), RoomError> {
        for attempt in 1..=JOIN_ATTEMPTS {
            let handle = self.get_or_create(&room_id).await;
            match handle
                .join(player.clone(), connection, sender.clone())
                .await
            {
                Ok(receipt) => return Ok((handle, receipt)),
                Err(RoomError::Unavailable(_)) => {
                    tracing::debug!(
                        %room_id,
                        %player,
                        attempt,
                        "room retired during join, retrying"
                    );
                    self.evict(&handle).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(RoomError::Unavailable(room_id))
    }

    /// Returns the handle of a live room.
    pub async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.lock().await.get(room_id).cloned()
    }

    /// Returns the number of rooms in the table.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Lists the ids of all rooms in the table.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.lock().await.keys().cloned().collect()
    }

    /// Shuts a room down and removes it from the table.
    ///
    /// # Errors
    /// Returns [`RoomError::Unavailable`] if there is no such room.
    pub async fn shutdown_room(&self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .lock()
            .await
            .remove(room_id)
            .ok_or_else(|| RoomError::Unavailable(room_id.clone()))?;
        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room shut down");
        Ok(())
    }

    /// Shuts down every room.
    pub async fn shutdown_all(&self) {
        let handles: Vec<RoomHandle> =
            self.rooms.lock().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }

    async fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }
        let handle = spawn_room(
            room_id.clone(),
            self.config.clone(),
            Arc::downgrade(&self.rooms),
        );
        rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, "room created");
        handle
    }

    /// Drops `handle` from the table if the entry is still that instance.
    async fn evict(&self, handle: &RoomHandle) {
        let mut rooms = self.rooms.lock().await;
        let same = rooms
            .get(handle.room_id())
            .is_some_and(|h| h.instance() == handle.instance());
        if same {
            rooms.remove(handle.room_id());
        }
    }
}
