//! Integration tests for the card duel server: real WebSocket clients and
//! HTTP requests against a server bound to an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

use cardduel::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    addr: SocketAddr,
}

fn seeded() -> RoomConfig {
    RoomConfig {
        rng_seed: Some(3),
        ..RoomConfig::default()
    }
}

/// Starts a built server and returns its address.
async fn launch(builder: CardDuelServerBuilder) -> TestServer {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    TestServer { addr }
}

async fn start_server_with(room: RoomConfig) -> TestServer {
    launch(CardDuelServerBuilder::new().room_config(room)).await
}

async fn start_server() -> TestServer {
    start_server_with(seeded()).await
}

async fn connect(server: &TestServer) -> ClientWs {
    let url = format!("ws://{}{}", server.addr, DEFAULT_WS_PATH);
    let (ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send");
}

/// Receives the next server message, failing after a generous timeout.
async fn recv(ws: &mut ClientWs) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_slice(&msg.into_data()).expect("decode server message");
        }
    }
}

/// Asserts nothing arrives for a short while.
async fn expect_silence(ws: &mut ClientWs) {
    let result = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(result.is_err(), "expected no message, got {result:?}");
}

fn created(msg: ServerMessage) -> (RoomId, PlayerId) {
    match msg {
        ServerMessage::RoomCreated { room_id, player_id } => (room_id, player_id),
        other => panic!("expected room_created, got {other:?}"),
    }
}

fn joined(msg: ServerMessage) -> (RoomId, PlayerId) {
    match msg {
        ServerMessage::RoomJoined { room_id, player_id } => (room_id, player_id),
        other => panic!("expected room_joined, got {other:?}"),
    }
}

/// `(status, round, players)` of a room_state.
fn state(msg: ServerMessage) -> (RoomStatus, u32, usize) {
    match msg {
        ServerMessage::RoomState {
            status,
            round,
            players,
            ..
        } => (status, round, players.len()),
        other => panic!("expected room_state, got {other:?}"),
    }
}

/// A creates a room and B joins it. Both inboxes are drained.
async fn start_duel(
    server: &TestServer,
) -> (ClientWs, PlayerId, ClientWs, PlayerId, RoomId) {
    let mut a = connect(server).await;
    send(&mut a, json!({"type": "create_room", "payload": {"playerName": "Ann"}})).await;
    let (room_id, ann) = created(recv(&mut a).await);
    state(recv(&mut a).await);

    let mut b = connect(server).await;
    send(
        &mut b,
        json!({"type": "join_room", "payload": {"roomId": room_id, "playerName": "Bob"}}),
    )
    .await;
    let (_, bob) = joined(recv(&mut b).await);
    state(recv(&mut b).await);
    state(recv(&mut a).await);

    (a, ann, b, bob, room_id)
}

async fn play(ws: &mut ClientWs, room_id: &RoomId, round: u32, player_id: &PlayerId, action: &str) {
    send(
        ws,
        json!({
            "type": "play_action",
            "payload": {"roomId": room_id, "round": round, "playerId": player_id, "action": action}
        }),
    )
    .await;
}

/// Minimal HTTP/1.1 GET; returns the parsed JSON body.
async fn http_get(addr: SocketAddr, path: &str) -> Value {
    let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.expect("write");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read");
    let text = String::from_utf8(raw).expect("utf8");
    assert!(text.starts_with("HTTP/1.1 200"), "unexpected response: {text}");
    let body = text.split("\r\n\r\n").nth(1).expect("body");
    serde_json::from_str(body).expect("json body")
}

// =========================================================================
// Creating and joining
// =========================================================================

#[tokio::test]
async fn test_create_room_bot_starts_playing() {
    let server = start_server().await;
    let mut ws = connect(&server).await;

    send(&mut ws, json!({"type": "create_room_bot", "payload": {"playerName": "Ann"}})).await;

    let (room_id, player_id) = created(recv(&mut ws).await);
    assert_eq!(room_id.as_str().len(), 6);
    assert!(player_id.as_str().starts_with("p_"));
    match recv(&mut ws).await {
        ServerMessage::RoomState {
            room_id: state_room,
            status,
            round,
            has_bot,
            players,
        } => {
            assert_eq!(state_room, room_id);
            assert_eq!(status, RoomStatus::Playing);
            assert_eq!(round, 1);
            assert!(has_bot);
            assert_eq!(players.len(), 2);
            assert_eq!(players[0].name, "Ann");
            assert!(players[1].is_bot);
        }
        other => panic!("expected room_state, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_room_starts_match_for_both() {
    let server = start_server().await;
    let mut a = connect(&server).await;
    send(&mut a, json!({"type": "create_room", "payload": {"playerName": "Ann"}})).await;
    let (room_id, _) = created(recv(&mut a).await);
    assert_eq!(state(recv(&mut a).await), (RoomStatus::Waiting, 1, 1));

    let mut b = connect(&server).await;
    send(
        &mut b,
        json!({"type": "join_room", "payload": {"roomId": room_id, "playerName": "Bob"}}),
    )
    .await;

    let (joined_room, _) = joined(recv(&mut b).await);
    assert_eq!(joined_room, room_id);
    assert_eq!(state(recv(&mut b).await), (RoomStatus::Playing, 1, 2));
    assert_eq!(state(recv(&mut a).await), (RoomStatus::Playing, 1, 2));
}

#[tokio::test]
async fn test_join_room_code_is_case_insensitive() {
    let server = start_server().await;
    let mut a = connect(&server).await;
    send(&mut a, json!({"type": "create_room", "payload": {"playerName": "Ann"}})).await;
    let (room_id, _) = created(recv(&mut a).await);

    let mut b = connect(&server).await;
    let typed = format!(" {} ", room_id.as_str().to_lowercase());
    send(
        &mut b,
        json!({"type": "join_room", "payload": {"roomId": typed, "playerName": "Bob"}}),
    )
    .await;
    let (joined_room, _) = joined(recv(&mut b).await);
    assert_eq!(joined_room, room_id);
}

#[tokio::test]
async fn test_join_unknown_room_not_found() {
    let server = start_server().await;
    let mut ws = connect(&server).await;

    send(
        &mut ws,
        json!({"type": "join_room", "payload": {"roomId": "ZZZZZZ", "playerName": "Bob"}}),
    )
    .await;

    assert_eq!(recv(&mut ws).await, ServerMessage::error("Room not found."));
    expect_silence(&mut ws).await;
}

#[tokio::test]
async fn test_join_full_room_rejected() {
    let server = start_server().await;
    let (_a, _, _b, _, room_id) = start_duel(&server).await;

    let mut c = connect(&server).await;
    send(
        &mut c,
        json!({"type": "join_room", "payload": {"roomId": room_id, "playerName": "Cat"}}),
    )
    .await;
    assert_eq!(recv(&mut c).await, ServerMessage::error("Room is full."));
}

// =========================================================================
// Rounds
// =========================================================================

#[tokio::test]
async fn test_round_resolves_once_and_advances() {
    let server = start_server().await;
    let (mut a, ann, mut b, bob, room_id) = start_duel(&server).await;

    play(&mut a, &room_id, 1, &ann, "attack").await;
    expect_silence(&mut a).await;
    play(&mut b, &room_id, 1, &bob, "defend").await;

    for ws in [&mut a, &mut b] {
        match recv(ws).await {
            ServerMessage::RoundResult {
                round,
                winner_player_id,
                outcomes,
                ..
            } => {
                assert_eq!(round, 1);
                assert_eq!(winner_player_id.as_ref(), Some(&bob));
                assert_eq!(outcomes.len(), 2);
            }
            other => panic!("expected round_result, got {other:?}"),
        }
        assert_eq!(state(recv(ws).await), (RoomStatus::Playing, 2, 2));
        expect_silence(ws).await;
    }
}

#[tokio::test]
async fn test_stale_round_action_dropped() {
    let server = start_server().await;
    let mut ws = connect(&server).await;
    send(&mut ws, json!({"type": "create_room_bot", "payload": {"playerName": "Ann"}})).await;
    let (room_id, ann) = created(recv(&mut ws).await);
    state(recv(&mut ws).await);

    play(&mut ws, &room_id, 5, &ann, "attack").await;
    expect_silence(&mut ws).await;

    // The current round still resolves normally.
    play(&mut ws, &room_id, 1, &ann, "defend").await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::RoundResult { round: 1, .. }));
}

#[tokio::test]
async fn test_action_for_another_player_dropped() {
    let server = start_server().await;
    let (mut a, ann, mut b, _, room_id) = start_duel(&server).await;

    // Bob's connection tries to act as Ann.
    play(&mut b, &room_id, 1, &ann, "attack").await;
    expect_silence(&mut b).await;
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn test_invalid_frames_dropped_silently() {
    let server = start_server().await;
    let mut ws = connect(&server).await;

    ws.send(Message::text("not json".to_string())).await.expect("send");
    send(&mut ws, json!({"type": "warp_drive", "payload": {}})).await;
    send(&mut ws, json!({"type": "create_room", "payload": {"playerName": "   "}})).await;
    expect_silence(&mut ws).await;

    send(&mut ws, json!({"type": "create_room", "payload": {"playerName": "Ann"}})).await;
    created(recv(&mut ws).await);
}

#[tokio::test]
async fn test_game_over_and_rematch() {
    let server = start_server_with(RoomConfig {
        rules: BattleRules {
            max_rounds: 1,
            ..BattleRules::default()
        },
        ..seeded()
    })
    .await;
    let (mut a, ann, mut b, bob, room_id) = start_duel(&server).await;

    play(&mut a, &room_id, 1, &ann, "rest").await;
    play(&mut b, &room_id, 1, &bob, "attack").await;

    for ws in [&mut a, &mut b] {
        assert!(matches!(recv(ws).await, ServerMessage::RoundResult { .. }));
        match recv(ws).await {
            ServerMessage::GameOver {
                winner_player_id,
                players,
                ..
            } => {
                assert_eq!(winner_player_id.as_ref(), Some(&bob));
                assert_eq!(players.len(), 2);
            }
            other => panic!("expected game_over, got {other:?}"),
        }
    }

    let mut c = connect(&server).await;
    send(
        &mut c,
        json!({"type": "join_room", "payload": {"roomId": room_id, "playerName": "Cat"}}),
    )
    .await;
    assert_eq!(recv(&mut c).await, ServerMessage::error("Room already finished."));

    send(
        &mut a,
        json!({"type": "rematch", "payload": {"roomId": room_id, "playerId": ann}}),
    )
    .await;
    assert_eq!(state(recv(&mut a).await), (RoomStatus::Playing, 1, 2));
    assert_eq!(state(recv(&mut b).await), (RoomStatus::Playing, 1, 2));
}

// =========================================================================
// Disconnection
// =========================================================================

#[tokio::test]
async fn test_opponent_disconnect_returns_room_to_waiting() {
    let server = start_server().await;
    let (mut a, _, b, _, _) = start_duel(&server).await;

    drop(b);

    assert_eq!(state(recv(&mut a).await), (RoomStatus::Waiting, 1, 1));
}

#[tokio::test]
async fn test_creating_again_releases_previous_seat() {
    let server = start_server().await;
    let (mut a, _, mut b, _, first_room) = start_duel(&server).await;

    send(&mut b, json!({"type": "create_room", "payload": {"playerName": "Bob"}})).await;
    let (second_room, _) = created(recv(&mut b).await);
    assert_ne!(second_room, first_room);

    assert_eq!(state(recv(&mut a).await), (RoomStatus::Waiting, 1, 1));
}

// =========================================================================
// Transport and HTTP lobby
// =========================================================================

#[tokio::test]
async fn test_wrong_ws_path_rejected() {
    let server = start_server().await;
    let result = tokio_tungstenite::connect_async(format!("ws://{}/elsewhere", server.addr)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = start_server().await;
    assert_eq!(http_get(server.addr, "/health").await, json!({"ok": true}));
}

#[tokio::test]
async fn test_lobby_lists_rooms() {
    let server = start_server().await;
    assert_eq!(http_get(server.addr, "/rooms").await, json!({"rooms": []}));

    let mut ws = connect(&server).await;
    send(&mut ws, json!({"type": "create_room_bot", "payload": {"playerName": "Ann"}})).await;
    let (room_id, _) = created(recv(&mut ws).await);

    for path in ["/rooms", ROOMS_PATH] {
        let body = http_get(server.addr, path).await;
        let rooms = body["rooms"].as_array().expect("rooms array");
        assert_eq!(rooms.len(), 1);
        let room = &rooms[0];
        assert_eq!(room["roomId"], json!(room_id.as_str()));
        assert_eq!(room["status"], json!("playing"));
        assert_eq!(room["playersCount"], json!(2));
        assert_eq!(room["hasBot"], json!(true));
        assert_eq!(room["players"][0], json!({"name": "Ann", "isBot": false}));
        assert!(room["createdAt"].is_string());
    }
}

#[tokio::test]
async fn test_lobby_drops_room_emptied_before_start() {
    let server = start_server().await;
    let mut ws = connect(&server).await;
    send(&mut ws, json!({"type": "create_room", "payload": {"playerName": "Ann"}})).await;
    created(recv(&mut ws).await);
    ws.close(None).await.expect("close");
    drop(ws);

    let empty = json!({"rooms": []});
    assert_eq!(wait_for_lobby(server.addr, &empty).await, empty);
}

/// Lobby body once it settles on `expected`, or the last one seen.
async fn wait_for_lobby(addr: SocketAddr, expected: &Value) -> Value {
    let mut rooms = Value::Null;
    for _ in 0..50 {
        rooms = http_get(addr, "/rooms").await;
        if &rooms == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    rooms
}

// =========================================================================
// Keepalive
// =========================================================================

async fn start_keepalive_server() -> TestServer {
    launch(
        CardDuelServerBuilder::new()
            .room_config(seeded())
            .keepalive(Duration::from_millis(50), Duration::from_millis(250)),
    )
    .await
}

#[tokio::test]
async fn test_waiting_creator_outlives_idle_timeout() {
    let server = start_keepalive_server().await;
    let mut ws = connect(&server).await;
    send(&mut ws, json!({"type": "create_room", "payload": {"playerName": "Ann"}})).await;
    let (room_id, _) = created(recv(&mut ws).await);
    state(recv(&mut ws).await);

    // Sends nothing, but keeps reading so pings get answered.
    let (_tx, mut rx) = ws.split();
    let drain = tokio::spawn(async move { while let Some(Ok(_)) = rx.next().await {} });
    tokio::time::sleep(Duration::from_millis(1000)).await;

    let body = http_get(server.addr, "/rooms").await;
    let rooms = body["rooms"].as_array().expect("rooms array");
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["roomId"], json!(room_id.as_str()));
    assert_eq!(rooms[0]["playersCount"], json!(1));
    drain.abort();
}

#[tokio::test]
async fn test_unresponsive_client_is_dropped() {
    let server = start_keepalive_server().await;
    let mut ws = connect(&server).await;
    send(&mut ws, json!({"type": "create_room", "payload": {"playerName": "Ann"}})).await;
    created(recv(&mut ws).await);

    // Never read again: pings pile up unanswered.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let empty = json!({"rooms": []});
    assert_eq!(wait_for_lobby(server.addr, &empty).await, empty);
    drop(ws);
}
