//! Wire protocol for the card duel server.
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`RoomSummary`], ...)
//!   are the structures that travel as JSON `{type, payload}` frames or in
//!   the lobby HTTP response.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) converts them to and from
//!   bytes.
//! - **Errors** ([`ProtocolError`]) cover decoding failures and payloads
//!   that parse but break boundary rules.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Session → Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Action, ClientMessage, LobbyPlayer, MAX_PLAYER_NAME_CHARS, PlayerId, PlayerView,
    Recipient, RoomId, RoomList, RoomStatus, RoomSummary, RoundOutcome, ServerMessage,
};
