//! Per-connection handler: decoding, identity checks, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Spawn a writer task that encodes queued `ServerMessage`s
//!   2. Loop: receive frames → decode → dispatch by message type
//!   3. On exit, vacate whatever seat the connection held
//!
//! Rooms push to the writer's channel directly, so a broadcast never waits
//! on this task or on a slow socket.

use std::sync::Arc;

use cardduel_protocol::{Action, ClientMessage, Codec, PlayerId, RoomId, ServerMessage};
use cardduel_room::{PlayerSender, RoomError, RoomHandle};
use cardduel_session::Binding;
use cardduel_transport::{Connection, ConnectionId, TransportError, WebSocketConnection};
use tokio::sync::mpsc;

use crate::CardDuelError;
use crate::server::ServerState;

/// Drop guard that vacates the connection's seat when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async work.
struct SeatGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SeatGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            release_seat(&state, conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), CardDuelError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbox, inbox) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), inbox));
    let _guard = SeatGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(TransportError::TimedOut(idle)) => {
                tracing::info!(%conn_id, ?idle, "connection went silent");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let msg = match state.codec.decode_client(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping invalid message");
                continue;
            }
        };

        let kind = msg.kind();
        if let Err(e) = handle_message(&state, conn_id, &outbox, msg).await {
            tracing::debug!(%conn_id, kind, error = %e, "message dropped");
        }
    }

    writer.abort();
    let _ = conn.close().await;
    // _guard drops here → seat is vacated.
    Ok(())
}

/// Encodes and sends everything queued for this connection.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(msg) = inbox.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, writer stopping");
            break;
        }
    }
}

/// Routes one decoded message.
///
/// Errors returned here are dropped by the caller. Join failures the
/// client must see are sent as `error` messages instead.
async fn handle_message<C: Codec>(
    state: &Arc<ServerState<C>>,
    conn_id: ConnectionId,
    outbox: &PlayerSender,
    msg: ClientMessage,
) -> Result<(), CardDuelError> {
    match msg {
        ClientMessage::CreateRoom { player_name } => {
            create_room(state, conn_id, outbox, player_name, false).await
        }
        ClientMessage::CreateRoomBot { player_name } => {
            create_room(state, conn_id, outbox, player_name, true).await
        }
        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => join_room(state, conn_id, outbox, room_id, player_name).await,
        ClientMessage::PlayAction {
            room_id,
            round,
            player_id,
            action,
        } => play_action(state, conn_id, room_id, round, player_id, action).await,
        ClientMessage::Rematch { room_id, player_id } => {
            let room = authorized_room(state, conn_id, &player_id, &room_id).await?;
            room.rematch(player_id).await?;
            Ok(())
        }
    }
}

async fn create_room<C: Codec>(
    state: &Arc<ServerState<C>>,
    conn_id: ConnectionId,
    outbox: &PlayerSender,
    player_name: String,
    with_bot: bool,
) -> Result<(), CardDuelError> {
    release_seat(state, conn_id).await;

    let created = state
        .rooms
        .lock()
        .await
        .create_room(player_name, outbox.clone(), with_bot);
    let (room, player_id) = created?;

    state
        .registry
        .lock()
        .await
        .bind(conn_id, player_id, room.room_id().clone());
    Ok(())
}

async fn join_room<C: Codec>(
    state: &Arc<ServerState<C>>,
    conn_id: ConnectionId,
    outbox: &PlayerSender,
    room_id: RoomId,
    player_name: String,
) -> Result<(), CardDuelError> {
    release_seat(state, conn_id).await;

    let found = state.rooms.lock().await.get_room(&room_id);
    let joined = match found {
        Ok(room) => room.join(player_name, outbox.clone()).await,
        Err(e) => Err(e),
    };

    match joined {
        Ok(player_id) => {
            state.registry.lock().await.bind(conn_id, player_id, room_id);
            Ok(())
        }
        Err(e) => reject(conn_id, outbox, e),
    }
}

/// Tells the client why a join failed, when it is allowed to know.
fn reject(
    conn_id: ConnectionId,
    outbox: &PlayerSender,
    err: RoomError,
) -> Result<(), CardDuelError> {
    match err.client_message() {
        Some(message) => {
            tracing::info!(%conn_id, error = %err, "join rejected");
            let _ = outbox.send(ServerMessage::error(message));
            Ok(())
        }
        None => Err(err.into()),
    }
}

async fn play_action<C: Codec>(
    state: &Arc<ServerState<C>>,
    conn_id: ConnectionId,
    room_id: RoomId,
    round: u32,
    player_id: PlayerId,
    action: Action,
) -> Result<(), CardDuelError> {
    let room = authorized_room(state, conn_id, &player_id, &room_id).await?;
    room.play_action(player_id, round, action).await?;
    Ok(())
}

/// Looks up a room after checking that `conn_id` speaks for `player_id`
/// in it.
async fn authorized_room<C: Codec>(
    state: &Arc<ServerState<C>>,
    conn_id: ConnectionId,
    player_id: &PlayerId,
    room_id: &RoomId,
) -> Result<RoomHandle, CardDuelError> {
    state
        .registry
        .lock()
        .await
        .authorize(conn_id, player_id, room_id)?;
    let room = state.rooms.lock().await.get_room(room_id)?;
    Ok(room)
}

/// Unbinds `conn_id` and tells its room the player has gone.
async fn release_seat<C: Codec>(state: &Arc<ServerState<C>>, conn_id: ConnectionId) {
    let binding = state.registry.lock().await.unbind(conn_id);
    if let Some(binding) = binding {
        vacate(state, binding).await;
    }
}

async fn vacate<C: Codec>(state: &Arc<ServerState<C>>, binding: Binding) {
    let Binding { player_id, room_id } = binding;
    let found = state.rooms.lock().await.get_room(&room_id);
    let Ok(room) = found else {
        return;
    };
    match room.leave(player_id.clone()).await {
        Ok(()) => tracing::info!(%room_id, %player_id, "seat vacated"),
        Err(e) => tracing::debug!(%room_id, %player_id, error = %e, "vacate failed"),
    }
}
