//! Room manager: creates, tracks, and routes players to rooms.

use std::collections::HashMap;

use cardduel_protocol::{PlayerId, RoomId, RoomSummary};
use tokio::sync::mpsc;

use crate::ids::{MAX_ID_ATTEMPTS, RandomRoomCodes, RoomCodes};
use crate::room::spawn_room;
use crate::{PlayerSender, RoomConfig, RoomError, RoomHandle};

/// Manages all active rooms.
///
/// This is the entry point for room operations from the server layer.
/// Rooms stop on their own (expiry, emptied before a match); each stopped
/// room's id arrives on the receiver returned by [`new`](Self::new) and
/// the owner is expected to call [`remove_room`](Self::remove_room).
pub struct RoomManager {
    /// Active rooms, keyed by room ID.
    rooms: HashMap<RoomId, RoomHandle>,
    config: RoomConfig,
    codes: Box<dyn RoomCodes>,
    closed_tx: mpsc::UnboundedSender<RoomId>,
}

impl RoomManager {
    /// Creates an empty manager and the channel closed rooms report on.
    pub fn new(config: RoomConfig) -> (Self, mpsc::UnboundedReceiver<RoomId>) {
        Self::with_codes(config, RandomRoomCodes)
    }

    /// Like [`new`](Self::new) with a custom room code source.
    pub fn with_codes(
        config: RoomConfig,
        codes: impl RoomCodes,
    ) -> (Self, mpsc::UnboundedReceiver<RoomId>) {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let manager = Self {
            rooms: HashMap::new(),
            config,
            codes: Box::new(codes),
            closed_tx,
        };
        (manager, closed_rx)
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a room with its creator seated.
    ///
    /// The creator's `room_created` and first `room_state` are already
    /// queued on `sender` when this returns.
    pub fn create_room(
        &mut self,
        player_name: String,
        sender: PlayerSender,
        with_bot: bool,
    ) -> Result<(RoomHandle, PlayerId), RoomError> {
        let room_id = self.free_room_id()?;
        let (handle, player_id) = spawn_room(
            room_id.clone(),
            player_name,
            sender,
            with_bot,
            self.config.clone(),
            self.closed_tx.clone(),
        );
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, %player_id, with_bot, "room created");
        Ok((handle, player_id))
    }

    fn free_room_id(&self) -> Result<RoomId, RoomError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.codes.next_code();
            if !self.rooms.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        tracing::error!(attempts = MAX_ID_ATTEMPTS, "room id space exhausted");
        Err(RoomError::IdGenerationFailed {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    pub fn get_room(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Seats a player in an existing room.
    ///
    /// The server instead clones the handle with
    /// [`get_room`](Self::get_room) and joins outside its lock.
    pub async fn join_room(
        &self,
        room_id: &RoomId,
        player_name: String,
        sender: PlayerSender,
    ) -> Result<(RoomHandle, PlayerId), RoomError> {
        let handle = self.get_room(room_id)?;
        let player_id = handle.join(player_name, sender).await?;
        Ok((handle, player_id))
    }

    /// Forgets a room and tells its actor to stop.
    pub fn remove_room(&mut self, room_id: &RoomId) -> Option<RoomHandle> {
        let handle = self.rooms.remove(room_id)?;
        handle.request_shutdown();
        tracing::info!(%room_id, "room removed");
        Some(handle)
    }

    /// Returns cloned handles to all active rooms.
    ///
    /// Useful when callers need to perform async operations on rooms
    /// without holding the manager lock.
    pub fn room_handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    /// Summaries of every room, newest first.
    ///
    /// Rooms that fail to respond (already stopping) are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        collect_summaries(self.room_handles()).await
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Queries each handle for its summary, newest room first.
pub async fn collect_summaries(handles: Vec<RoomHandle>) -> Vec<RoomSummary> {
    let mut summaries = Vec::with_capacity(handles.len());
    for handle in handles {
        if let Ok(summary) = handle.summary().await {
            summaries.push(summary);
        }
    }
    summaries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.room_id.as_str().cmp(b.room_id.as_str()))
    });
    summaries
}
