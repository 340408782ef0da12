//! The connection registry: who is speaking on which connection.
//!
//! `ConnectionRegistry` is a plain pair of maps. It is shared behind a
//! `tokio::sync::Mutex` by the server, and every method is synchronous so
//! the lock is never held across an await.

use std::collections::{BTreeSet, HashMap};

use cardduel_protocol::{PlayerId, RoomId};
use cardduel_transport::ConnectionId;

use crate::RegistryError;

/// The seat a connection currently speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub player_id: PlayerId,
    pub room_id: RoomId,
}

/// Maps connections to player seats, and rooms back to connections.
///
/// ## Lifecycle
///
/// ```text
/// create/join ──→ bind() ──→ [bound] ──→ unbind() ──→ caller tells the room
///                               │
///                               └── room closed ──→ unbind_room()
/// ```
///
/// A connection holds at most one binding. Binding again replaces the
/// previous one and hands it back so the caller can vacate the old seat.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    bindings: HashMap<ConnectionId, Binding>,
    /// Reverse index, kept in sync with `bindings`.
    rooms: HashMap<RoomId, BTreeSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `conn` to a player seat. Returns the binding it replaced.
    pub fn bind(
        &mut self,
        conn: ConnectionId,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Option<Binding> {
        let previous = self.unbind(conn);
        self.rooms.entry(room_id.clone()).or_default().insert(conn);
        tracing::debug!(%conn, %player_id, %room_id, "connection bound");
        self.bindings.insert(conn, Binding { player_id, room_id });
        previous
    }

    /// Removes the binding for `conn`.
    ///
    /// The returned binding is the disconnection signal: the caller must
    /// tell that room the player has gone.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<Binding> {
        let binding = self.bindings.remove(&conn)?;
        if let Some(conns) = self.rooms.get_mut(&binding.room_id) {
            conns.remove(&conn);
            if conns.is_empty() {
                self.rooms.remove(&binding.room_id);
            }
        }
        tracing::debug!(%conn, player_id = %binding.player_id, "connection unbound");
        Some(binding)
    }

    /// Checks that `conn` speaks for `player_id` in `room_id`.
    pub fn authorize(
        &self,
        conn: ConnectionId,
        player_id: &PlayerId,
        room_id: &RoomId,
    ) -> Result<(), RegistryError> {
        let binding = self
            .bindings
            .get(&conn)
            .ok_or(RegistryError::NotBound(conn))?;
        if &binding.player_id != player_id || &binding.room_id != room_id {
            return Err(RegistryError::Mismatch {
                conn,
                bound_player: binding.player_id.clone(),
                bound_room: binding.room_id.clone(),
                player: player_id.clone(),
                room: room_id.clone(),
            });
        }
        Ok(())
    }

    /// Connections bound to seats in `room_id`, in id order.
    pub fn connections_for_room(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drops every binding into a room that no longer exists.
    pub fn unbind_room(&mut self, room_id: &RoomId) -> Vec<ConnectionId> {
        let conns = self.connections_for_room(room_id);
        self.rooms.remove(room_id);
        for conn in &conns {
            self.bindings.remove(conn);
        }
        conns
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
