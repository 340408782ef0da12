//! Codec trait and the JSON implementation used on the wire.
//!
//! The connection handler only talks to [`Codec`], so the frame format can
//! change without touching room or session code.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ClientMessage, ProtocolError};

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes an inbound frame and applies boundary validation.
    fn decode_client(&self, data: &[u8]) -> Result<ClientMessage, ProtocolError> {
        self.decode::<ClientMessage>(data)?.validated()
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use cardduel_protocol::{Codec, JsonCodec, ServerMessage};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ServerMessage::error("Room not found.")).unwrap();
/// assert_eq!(
///     bytes,
///     br#"{"type":"error","payload":{"message":"Room not found."}}"#
/// );
///
/// let msg = codec
///     .decode_client(br#"{"type":"create_room","payload":{"playerName":" Ann "}}"#)
///     .unwrap();
/// assert_eq!(msg.kind(), "create_room");
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
