//! Error types for the protocol layer.

/// Errors that can occur while reading or writing wire messages.
///
/// None of these are reported back to the client: a frame that fails
/// here is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame is not valid JSON, has an unknown `type`, or is missing
    /// a required payload field.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but a field violates a boundary rule,
    /// such as a blank player name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
