//! Client connections for the card duel server.
//!
//! The server loop only sees [`Transport`] and [`Connection`]. The
//! `websocket` feature (default) supplies both as an `axum` upgrade route,
//! so game sockets share a port with the HTTP lobby.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{AcceptOptions, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Key the connection registry binds players under. Never reused within
/// a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of player sockets.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Next upgraded socket. Fails once no more can arrive.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// One player socket carrying whole JSON frames.
///
/// A writer task calls `send` while the handler sits in `recv`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// `Ok(None)` once the client closes.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
