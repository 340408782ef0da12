//! `CardDuelServer` builder and server loop.
//!
//! This is the entry point for running a card duel server. It ties
//! together all the layers: transport → protocol → session → room, plus
//! the HTTP lobby. The lobby and the WebSocket upgrade share one router
//! and one listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use cardduel_protocol::{Codec, JsonCodec, RoomId};
use cardduel_room::{RoomConfig, RoomManager};
use cardduel_session::ConnectionRegistry;
use cardduel_transport::{AcceptOptions, Transport, TransportError, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};

use crate::handler::handle_connection;
use crate::{CardDuelError, ServerConfig, lobby};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
/// Neither lock is held across a call into a room actor.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Mutex<ConnectionRegistry>,
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a card duel server.
///
/// # Example
///
/// ```rust,no_run
/// use cardduel::prelude::*;
///
/// # async fn start() -> Result<(), CardDuelError> {
/// let server = CardDuelServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CardDuelServerBuilder {
    config: ServerConfig,
}

impl CardDuelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address the listener binds to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    pub fn ws_path(mut self, path: &str) -> Self {
        self.config.ws_path = path.to_string();
        self
    }

    /// Sets how often sockets are pinged and how long a silent one lives.
    pub fn keepalive(mut self, ping_interval: Duration, idle_timeout: Duration) -> Self {
        self.config.ping_interval = ping_interval;
        self.config.connection_idle_timeout = idle_timeout;
        self
    }

    /// Sets expiry windows, combat rules and bot behaviour.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Binds the listener and assembles the router.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<CardDuelServer<JsonCodec>, CardDuelError> {
        let listener = TcpListener::bind(&self.config.bind).await?;
        let local_addr = listener.local_addr()?;

        let (transport, ws_routes) = WebSocketTransport::new(AcceptOptions {
            path: self.config.ws_path.clone(),
            ping_interval: self.config.ping_interval,
            idle_timeout: self.config.connection_idle_timeout,
        });

        let (rooms, closed_rooms) = RoomManager::new(self.config.room.clone());
        let state = Arc::new(ServerState {
            registry: Mutex::new(ConnectionRegistry::new()),
            rooms: Mutex::new(rooms),
            codec: JsonCodec,
            config: self.config,
        });
        let app = lobby::router(Arc::clone(&state)).merge(ws_routes);

        Ok(CardDuelServer {
            transport,
            listener,
            local_addr,
            app,
            closed_rooms,
            state,
        })
    }
}

impl Default for CardDuelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound card duel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CardDuelServer<C: Codec> {
    transport: WebSocketTransport,
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Router,
    closed_rooms: mpsc::UnboundedReceiver<RoomId>,
    state: Arc<ServerState<C>>,
}

impl CardDuelServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CardDuelServerBuilder {
        CardDuelServerBuilder::new()
    }
}

impl<C: Codec> CardDuelServer<C> {
    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the server.
    ///
    /// Serves the router and starts the room reaper, then takes upgraded
    /// sockets and spawns a handler task for each. Runs until the process
    /// is terminated.
    pub async fn run(self) -> Result<(), CardDuelError> {
        let Self {
            mut transport,
            listener,
            local_addr,
            app,
            closed_rooms,
            state,
        } = self;

        tokio::spawn(reap_closed_rooms(Arc::clone(&state), closed_rooms));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "HTTP server stopped");
            }
        });

        tracing::info!(
            addr = %local_addr,
            ws_path = %state.config.ws_path,
            "card duel server running"
        );

        loop {
            match transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(TransportError::Shutdown) => {
                    tracing::info!("upgrade route gone, server stopping");
                    return Err(TransportError::Shutdown.into());
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Drops rooms whose actors have stopped, and the bindings into them.
async fn reap_closed_rooms<C: Codec>(
    state: Arc<ServerState<C>>,
    mut closed: mpsc::UnboundedReceiver<RoomId>,
) {
    while let Some(room_id) = closed.recv().await {
        state.rooms.lock().await.remove_room(&room_id);
        let dropped = state.registry.lock().await.unbind_room(&room_id);
        tracing::debug!(%room_id, bindings = dropped.len(), "closed room reaped");
    }
}
