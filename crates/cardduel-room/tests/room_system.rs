//! Integration tests for the room system: manager, actors and expiry.

use std::time::Duration;

use cardduel_battle::BattleRules;
use cardduel_protocol::{Action, RoomId, RoomStatus, ServerMessage};
use cardduel_room::{PlayerSender, RoomConfig, RoomError, RoomManager};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn config() -> RoomConfig {
    RoomConfig {
        rng_seed: Some(5),
        ..RoomConfig::default()
    }
}

/// One round per match, so a single exchange finishes it.
fn one_round_config() -> RoomConfig {
    RoomConfig {
        rules: BattleRules {
            max_rounds: 1,
            ..BattleRules::default()
        },
        ..config()
    }
}

fn inbox() -> (PlayerSender, mpsc::UnboundedReceiver<ServerMessage>) {
    mpsc::unbounded_channel()
}

/// Drains everything already queued for a player.
fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn kinds(msgs: &[ServerMessage]) -> Vec<&'static str> {
    msgs.iter().map(ServerMessage::kind).collect()
}

fn state_of(msg: &ServerMessage) -> (RoomStatus, u32, usize) {
    match msg {
        ServerMessage::RoomState {
            status,
            round,
            players,
            ..
        } => (*status, *round, players.len()),
        other => panic!("expected room_state, got {other:?}"),
    }
}

// =========================================================================
// Create / join
// =========================================================================

#[tokio::test]
async fn test_create_room_queues_created_then_waiting_state() {
    let (mut mgr, _closed) = RoomManager::new(config());
    let (tx, mut rx) = inbox();
    let (handle, player_id) = mgr.create_room("Ann".into(), tx, false).unwrap();

    let msgs = drain(&mut rx);
    assert_eq!(kinds(&msgs), vec!["room_created", "room_state"]);
    match &msgs[0] {
        ServerMessage::RoomCreated {
            room_id,
            player_id: created,
        } => {
            assert_eq!(room_id, handle.room_id());
            assert_eq!(created, &player_id);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(state_of(&msgs[1]), (RoomStatus::Waiting, 1, 1));
}

#[tokio::test]
async fn test_join_room_starts_match_for_both_players() {
    let (mut mgr, _closed) = RoomManager::new(config());
    let (ann_tx, mut ann_rx) = inbox();
    let (bob_tx, mut bob_rx) = inbox();
    let (handle, _) = mgr.create_room("Ann".into(), ann_tx, false).unwrap();
    drain(&mut ann_rx);

    let (_, bob) = mgr
        .join_room(handle.room_id(), "Bob".into(), bob_tx)
        .await
        .unwrap();
    assert!(bob.as_str().starts_with("p_"));

    let ann_msgs = drain(&mut ann_rx);
    let bob_msgs = drain(&mut bob_rx);
    assert_eq!(kinds(&ann_msgs), vec!["room_state"]);
    assert_eq!(kinds(&bob_msgs), vec!["room_joined", "room_state"]);
    assert_eq!(state_of(&ann_msgs[0]), (RoomStatus::Playing, 1, 2));
    assert_eq!(state_of(&bob_msgs[1]), (RoomStatus::Playing, 1, 2));
}

#[tokio::test]
async fn test_join_room_unknown_id_not_found() {
    let (mgr, _closed) = RoomManager::new(config());
    let (tx, _rx) = inbox();
    let err = mgr
        .join_room(&RoomId::new("ZZZZZZ"), "Bob".into(), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
    assert_eq!(err.client_message(), Some("Room not found."));
}

#[tokio::test]
async fn test_join_room_full() {
    let (mut mgr, _closed) = RoomManager::new(config());
    let (tx, _rx) = inbox();
    let (handle, _) = mgr.create_room("Ann".into(), tx, true).unwrap();

    let (tx, mut rx) = inbox();
    let err = mgr
        .join_room(handle.room_id(), "Cat".into(), tx)
        .await
        .unwrap_err();
    assert_eq!(err.client_message(), Some("Room is full."));
    assert!(drain(&mut rx).is_empty());
}

// =========================================================================
// Rounds
// =========================================================================

#[tokio::test]
async fn test_round_resolves_once_for_both_players() {
    let (mut mgr, _closed) = RoomManager::new(config());
    let (ann_tx, mut ann_rx) = inbox();
    let (bob_tx, mut bob_rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), ann_tx, false).unwrap();
    let (_, bob) = mgr
        .join_room(handle.room_id(), "Bob".into(), bob_tx)
        .await
        .unwrap();
    drain(&mut ann_rx);
    drain(&mut bob_rx);

    handle.play_action(ann, 1, Action::Attack).await.unwrap();
    handle.play_action(bob, 1, Action::Defend).await.unwrap();
    // Commands run in order, so a summary reply means both were handled.
    handle.summary().await.unwrap();

    for msgs in [drain(&mut ann_rx), drain(&mut bob_rx)] {
        assert_eq!(kinds(&msgs), vec!["round_result", "room_state"]);
        assert_eq!(state_of(&msgs[1]), (RoomStatus::Playing, 2, 2));
    }
}

#[tokio::test]
async fn test_stale_action_is_dropped_silently() {
    let (mut mgr, _closed) = RoomManager::new(config());
    let (ann_tx, mut ann_rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), ann_tx, true).unwrap();
    drain(&mut ann_rx);

    handle.play_action(ann, 7, Action::Attack).await.unwrap();
    let summary = handle.summary().await.unwrap();

    assert!(drain(&mut ann_rx).is_empty());
    assert_eq!(summary.status, RoomStatus::Playing);
}

#[tokio::test]
async fn test_bot_room_resolves_on_human_action() {
    let (mut mgr, _closed) = RoomManager::new(config());
    let (tx, mut rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), tx, true).unwrap();
    drain(&mut rx);

    handle.play_action(ann, 1, Action::Defend).await.unwrap();
    handle.summary().await.unwrap();

    let msgs = drain(&mut rx);
    assert_eq!(kinds(&msgs), vec!["round_result", "room_state"]);
}

#[tokio::test]
async fn test_finished_room_rejects_joins_and_rematches() {
    let (mut mgr, _closed) = RoomManager::new(one_round_config());
    let (ann_tx, mut ann_rx) = inbox();
    let (bob_tx, mut bob_rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), ann_tx, false).unwrap();
    let (_, bob) = mgr
        .join_room(handle.room_id(), "Bob".into(), bob_tx)
        .await
        .unwrap();

    handle.play_action(ann.clone(), 1, Action::Rest).await.unwrap();
    handle.play_action(bob, 1, Action::Attack).await.unwrap();
    handle.summary().await.unwrap();
    drain(&mut bob_rx);
    assert_eq!(
        kinds(&drain(&mut ann_rx)),
        vec!["room_created", "room_state", "room_state", "round_result", "game_over"]
    );

    let (tx, _rx) = inbox();
    let err = mgr
        .join_room(handle.room_id(), "Cat".into(), tx)
        .await
        .unwrap_err();
    assert_eq!(err.client_message(), Some("Room already finished."));

    handle.rematch(ann).await.unwrap();
    let summary = handle.summary().await.unwrap();
    assert_eq!(summary.status, RoomStatus::Playing);
    assert_eq!(state_of(&drain(&mut ann_rx)[0]), (RoomStatus::Playing, 1, 2));
}

#[tokio::test(start_paused = true)]
async fn test_finished_room_stays_finished_after_opponent_leaves() {
    let (mut mgr, mut closed) = RoomManager::new(one_round_config());
    let (ann_tx, mut ann_rx) = inbox();
    let (bob_tx, _bob_rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), ann_tx, false).unwrap();
    let (_, bob) = mgr
        .join_room(handle.room_id(), "Bob".into(), bob_tx)
        .await
        .unwrap();
    handle.play_action(ann, 1, Action::Rest).await.unwrap();
    handle.play_action(bob.clone(), 1, Action::Attack).await.unwrap();
    handle.leave(bob).await.unwrap();

    let msgs = drain(&mut ann_rx);
    assert_eq!(
        state_of(msgs.last().unwrap()),
        (RoomStatus::Finished, 1, 1)
    );

    let (tx, _rx) = inbox();
    let err = mgr
        .join_room(handle.room_id(), "Cat".into(), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::RoomFinished(_)));
    assert_eq!(handle.summary().await.unwrap().status, RoomStatus::Finished);

    // The finished-room ttl still applies, not the waiting-room rules.
    let room_id = tokio::time::timeout(Duration::from_secs(121), closed.recv())
        .await
        .expect("finished room should expire")
        .unwrap();
    assert_eq!(&room_id, handle.room_id());
}

// =========================================================================
// Lifecycle and expiry
// =========================================================================

#[tokio::test]
async fn test_room_closes_when_emptied_before_a_match() {
    let (mut mgr, mut closed) = RoomManager::new(config());
    let (tx, _rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), tx, false).unwrap();

    handle.leave(ann).await.unwrap();

    let room_id = closed.recv().await.unwrap();
    assert_eq!(&room_id, handle.room_id());
    assert!(mgr.remove_room(&room_id).is_some());
    assert_eq!(mgr.room_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_started_room_waits_for_grace() {
    let (mut mgr, mut closed) = RoomManager::new(config());
    let (tx, _rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), tx, true).unwrap();

    handle.leave(ann).await.unwrap();
    // Still alive right after the last human left.
    let summary = handle.summary().await.unwrap();
    assert_eq!(summary.status, RoomStatus::Waiting);
    assert!(closed.try_recv().is_err());

    let room_id = tokio::time::timeout(Duration::from_secs(31), closed.recv())
        .await
        .expect("room should expire after the grace period")
        .unwrap();
    assert_eq!(&room_id, handle.room_id());
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_within_grace_keeps_room() {
    let (mut mgr, mut closed) = RoomManager::new(config());
    let (tx, _rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), tx, true).unwrap();
    handle.leave(ann).await.unwrap();

    tokio::time::advance(Duration::from_secs(10)).await;
    let (tx, _rx2) = inbox();
    mgr.join_room(handle.room_id(), "Ann".into(), tx)
        .await
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(300), closed.recv()).await;
    assert!(result.is_err(), "occupied room must not expire");
    assert_eq!(handle.summary().await.unwrap().status, RoomStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_finished_room_expires_after_ttl() {
    let (mut mgr, mut closed) = RoomManager::new(one_round_config());
    let (tx, _rx) = inbox();
    let (handle, ann) = mgr.create_room("Ann".into(), tx, true).unwrap();

    handle.play_action(ann, 1, Action::Defend).await.unwrap();
    assert_eq!(handle.summary().await.unwrap().status, RoomStatus::Finished);

    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(closed.try_recv().is_err());

    let room_id = tokio::time::timeout(Duration::from_secs(61), closed.recv())
        .await
        .expect("finished room should expire")
        .unwrap();
    assert_eq!(&room_id, handle.room_id());
}

#[tokio::test]
async fn test_remove_room_stops_actor() {
    let (mut mgr, mut closed) = RoomManager::new(config());
    let (tx, _rx) = inbox();
    let (handle, _) = mgr.create_room("Ann".into(), tx, false).unwrap();

    mgr.remove_room(handle.room_id());
    assert_eq!(&closed.recv().await.unwrap(), handle.room_id());
    assert!(handle.summary().await.is_err());
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_list_rooms_empty() {
    let (mgr, _closed) = RoomManager::new(config());
    assert!(mgr.list_rooms().await.is_empty());
}

#[tokio::test]
async fn test_list_rooms_reports_every_status() {
    let (mut mgr, _closed) = RoomManager::new(config());
    let (tx1, _rx1) = inbox();
    let (tx2, _rx2) = inbox();
    let (waiting, _) = mgr.create_room("Ann".into(), tx1, false).unwrap();
    let (playing, _) = mgr.create_room("Bob".into(), tx2, true).unwrap();

    let rooms = mgr.list_rooms().await;
    assert_eq!(rooms.len(), 2);

    let find = |id: &RoomId| rooms.iter().find(|r| &r.room_id == id).unwrap();
    let w = find(waiting.room_id());
    assert_eq!(w.status, RoomStatus::Waiting);
    assert_eq!(w.players_count, 1);
    assert!(!w.has_bot);

    let p = find(playing.room_id());
    assert_eq!(p.status, RoomStatus::Playing);
    assert_eq!(p.players_count, 2);
    assert!(p.has_bot);
    assert!(p.players.iter().any(|pl| pl.is_bot));
}
