//! Error types for the room layer.

use cardduel_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
///
/// Only the join failures are shown to clients, through
/// [`client_message`](Self::client_message). The rest describe messages
/// that are dropped.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Both seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The match in this room is over.
    #[error("room {0} already finished")]
    RoomFinished(RoomId),

    /// The player has no seat in this room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// An action named a round other than the current one.
    #[error("stale action in room {room_id}: expected round {expected}, got {received}")]
    StaleAction {
        room_id: RoomId,
        expected: u32,
        received: u32,
    },

    /// Actions are only accepted while a match is being played.
    #[error("room {0} is not playing")]
    NotPlaying(RoomId),

    /// The player already locked in an action for this round.
    #[error("player {0} already acted in round {1}")]
    AlreadySubmitted(PlayerId, u32),

    /// Every generated room code collided with a live room.
    #[error("could not generate a free room id after {attempts} attempts")]
    IdGenerationFailed { attempts: usize },

    /// The room's actor has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// The exact text sent in an `error` message, for errors clients see.
    pub fn client_message(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) => Some("Room not found."),
            Self::RoomFull(_) => Some("Room is full."),
            Self::RoomFinished(_) => Some("Room already finished."),
            _ => None,
        }
    }
}
