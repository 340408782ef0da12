use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer sent nothing, not even a pong, for this long.
    #[error("no frame from peer in {0:?}")]
    TimedOut(Duration),

    /// The upgrade route is gone; no more connections will arrive.
    #[error("transport shut down")]
    Shutdown,
}
