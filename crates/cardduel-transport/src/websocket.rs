//! WebSocket transport served from an `axum` route.
//!
//! Upgrades run inside axum's HTTP server, so the game socket shares its
//! listener with every other route merged into the same router. Upgraded
//! sockets reach [`WebSocketTransport::accept`] through a bounded channel
//! whose only sender lives in the route state: once the router is
//! dropped, `accept` reports [`TransportError::Shutdown`].
//!
//! Browsers never ping on their own, so each connection runs a pinger and
//! `recv` treats any frame, pongs included, as proof of life.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::{Connection, ConnectionId, Transport, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Upgraded connections waiting for `accept`.
const ACCEPT_BACKLOG: usize = 64;

type WsSink = SplitSink<WebSocket, Message>;

/// Settings for the upgrade route and every socket it produces.
#[derive(Debug, Clone)]
pub struct AcceptOptions {
    /// Route the upgrade is served on. Requests elsewhere fall through to
    /// the rest of the router, usually a 404.
    pub path: String,

    /// How often an open socket is pinged.
    pub ping_interval: Duration,

    /// A socket that delivers no frame for this long is dead. Must exceed
    /// `ping_interval` so a healthy client's pong always lands in time.
    pub idle_timeout: Duration,
}

impl Default for AcceptOptions {
    fn default() -> Self {
        Self {
            path: "/ws".to_string(),
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Route state: the sending half of the accept queue.
struct Upgrades {
    tx: mpsc::Sender<WebSocketConnection>,
    options: AcceptOptions,
}

/// Receives sockets upgraded by the router returned from [`new`](Self::new).
pub struct WebSocketTransport {
    incoming: mpsc::Receiver<WebSocketConnection>,
}

impl WebSocketTransport {
    /// Creates the transport and the route that feeds it. Merge the router
    /// into the app being served.
    pub fn new(options: AcceptOptions) -> (Self, Router) {
        let (tx, rx) = mpsc::channel(ACCEPT_BACKLOG);
        let path = options.path.clone();
        tracing::info!(%path, "WebSocket upgrade route ready");

        let router = Router::new()
            .route(&path, get(upgrade))
            .with_state(Arc::new(Upgrades { tx, options }));
        (Self { incoming: rx }, router)
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.incoming.recv().await.ok_or(TransportError::Shutdown)
    }
}

async fn upgrade(State(upgrades): State<Arc<Upgrades>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        let conn = WebSocketConnection::new(socket, &upgrades.options);
        tracing::debug!(id = %conn.id, "accepted WebSocket connection");
        if upgrades.tx.send(conn).await.is_err() {
            tracing::debug!("transport gone, dropping upgraded socket");
        }
    })
}

/// A single upgraded socket.
///
/// Split into halves so a writer task can push frames while the reader is
/// parked in `recv`. The sink is shared with the pinger.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Arc<Mutex<WsSink>>,
    stream: Mutex<SplitStream<WebSocket>>,
    idle_timeout: Duration,
    pinger: JoinHandle<()>,
}

impl WebSocketConnection {
    fn new(socket: WebSocket, options: &AcceptOptions) -> Self {
        let (sink, stream) = socket.split();
        let sink = Arc::new(Mutex::new(sink));
        let pinger = tokio::spawn(ping_loop(Arc::clone(&sink), options.ping_interval));
        Self {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            sink,
            stream: Mutex::new(stream),
            idle_timeout: options.idle_timeout,
            pinger,
        }
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.pinger.abort();
    }
}

async fn ping_loop(sink: Arc<Mutex<WsSink>>, period: Duration) {
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        if sink.lock().await.send(Message::Ping(Vec::new())).await.is_err() {
            break;
        }
    }
}

fn io_error(kind: std::io::ErrorKind, e: axum::Error) -> std::io::Error {
    std::io::Error::new(kind, e)
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// UTF-8 payloads go out as text frames, anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned()),
            Err(_) => Message::Binary(data.to_vec()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            let frame = tokio::time::timeout(self.idle_timeout, stream.next())
                .await
                .map_err(|_| TransportError::TimedOut(self.idle_timeout))?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.into_bytes())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io_error(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.pinger.abort();
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
