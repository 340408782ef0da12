//! Error types for the session layer.

use cardduel_protocol::{PlayerId, RoomId};
use cardduel_transport::ConnectionId;

/// Reasons a connection may not act for a player.
///
/// These never reach the client; the offending message is dropped.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The connection has no seat in any room.
    #[error("{0} is not bound to a player")]
    NotBound(ConnectionId),

    /// The connection speaks for a different player or room.
    #[error("{conn} is bound to {bound_player} in room {bound_room}, not {player} in room {room}")]
    Mismatch {
        conn: ConnectionId,
        bound_player: PlayerId,
        bound_room: RoomId,
        player: PlayerId,
        room: RoomId,
    },
}
