//! Unified error type for the CardDuel server.

use cardduel_protocol::ProtocolError;
use cardduel_room::RoomError;
use cardduel_session::RegistryError;
use cardduel_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CardDuelError {
    /// A transport-level error (send, recv, silent peer).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The connection does not speak for the player it named.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A room-level error (not found, full, finished, stale action).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Binding the listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
