//! Wire types for the card duel protocol.
//!
//! Every frame in either direction is a JSON object
//! `{ "type": "<snake_case>", "payload": { ...camelCase fields } }`.
//! [`ClientMessage`] and [`ServerMessage`] model the two directions as
//! adjacently tagged enums so the `type` discriminant is checked by serde
//! and a frame with an unknown type simply fails to decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

/// Longest player name kept, in characters. Longer names are truncated.
pub const MAX_PLAYER_NAME_CHARS: usize = 24;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier the server hands out when a player takes a seat.
///
/// Serialized as a bare string (`"p_x7k2..."`), matching what the client
/// echoes back in `play_action` and `rematch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short room code shown in the lobby and typed in by joining players.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game vocabulary
// ---------------------------------------------------------------------------

/// What a fighter does in one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Attack,
    Defend,
    Rest,
}

impl Action {
    /// Every action, in a fixed order.
    pub const ALL: [Action; 3] = [Action::Attack, Action::Defend, Action::Rest];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Attack => "attack",
            Self::Defend => "defend",
            Self::Rest => "rest",
        })
    }
}

/// Lifecycle state of a room.
///
/// ```text
/// Waiting ──(2 seats)──→ Playing ──(terminal)──→ Finished
///    ↑                      │                       │
///    └──(seat vacated)──────┘                       │
///    └──(rematch)───────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if a new player may take the free seat.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if moving from `self` to `target` is a legal edge.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Playing)
                | (Self::Playing, Self::Finished)
                | (Self::Playing, Self::Waiting)
                | (Self::Finished, Self::Waiting)
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Finished => "finished",
        })
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who a server message produced by a room is meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every seated human.
    All,
    /// One seated player.
    Player(PlayerId),
}

// ---------------------------------------------------------------------------
// Payload building blocks
// ---------------------------------------------------------------------------

/// One seat as shown in `room_state` and `game_over`.
///
/// The pending action is never revealed; only whether one was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub name: String,
    pub is_bot: bool,
    pub hp: u32,
    pub max_hp: u32,
    pub stamina: u32,
    pub max_stamina: u32,
    pub wins: u32,
    pub has_acted: bool,
}

/// One player's side of a resolved round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOutcome {
    pub player_id: PlayerId,
    /// The action actually played.
    pub action: Action,
    /// `true` when the submitted action was unaffordable and became `rest`.
    pub forced: bool,
    pub damage_taken: u32,
    pub healed: u32,
    pub hp: u32,
    pub stamina: u32,
}

/// A player entry in the lobby listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    pub name: String,
    pub is_bot: bool,
}

/// Read-only lobby projection of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub players_count: usize,
    pub has_bot: bool,
    pub players: Vec<LobbyPlayer>,
    pub created_at: DateTime<Utc>,
}

/// Body of `GET /rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomList {
    pub rooms: Vec<RoomSummary>,
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Open a room and wait for a human opponent.
    CreateRoom { player_name: String },

    /// Open a room against a bot; the match starts at once.
    CreateRoomBot { player_name: String },

    /// Take the free seat in an existing room.
    JoinRoom { room_id: RoomId, player_name: String },

    /// Submit an action for `round`.
    PlayAction {
        room_id: RoomId,
        round: u32,
        player_id: PlayerId,
        action: Action,
    },

    /// Ask to play again after `game_over`.
    Rematch { room_id: RoomId, player_id: PlayerId },
}

impl ClientMessage {
    /// Checks boundary rules serde can't express and normalizes names.
    ///
    /// Names are trimmed and truncated to [`MAX_PLAYER_NAME_CHARS`];
    /// a blank name is rejected.
    pub fn validated(self) -> Result<Self, ProtocolError> {
        match self {
            Self::CreateRoom { player_name } => Ok(Self::CreateRoom {
                player_name: normalize_name(&player_name)?,
            }),
            Self::CreateRoomBot { player_name } => Ok(Self::CreateRoomBot {
                player_name: normalize_name(&player_name)?,
            }),
            Self::JoinRoom { room_id, player_name } => Ok(Self::JoinRoom {
                room_id: RoomId(room_id.0.trim().to_ascii_uppercase()),
                player_name: normalize_name(&player_name)?,
            }),
            other => Ok(other),
        }
    }

    /// Message type as it appears on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::CreateRoomBot { .. } => "create_room_bot",
            Self::JoinRoom { .. } => "join_room",
            Self::PlayAction { .. } => "play_action",
            Self::Rematch { .. } => "rematch",
        }
    }
}

fn normalize_name(raw: &str) -> Result<String, ProtocolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::InvalidMessage("player name is empty".into()));
    }
    Ok(trimmed.chars().take(MAX_PLAYER_NAME_CHARS).collect())
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Messages the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Sent to the creator only, before the first `room_state`.
    RoomCreated { room_id: RoomId, player_id: PlayerId },

    /// Sent to the joiner only, before the `room_state` broadcast.
    RoomJoined { room_id: RoomId, player_id: PlayerId },

    /// Full snapshot of a room.
    RoomState {
        room_id: RoomId,
        status: RoomStatus,
        round: u32,
        has_bot: bool,
        players: Vec<PlayerView>,
    },

    /// Outcome of one resolved round.
    RoundResult {
        room_id: RoomId,
        round: u32,
        winner_player_id: Option<PlayerId>,
        outcomes: Vec<RoundOutcome>,
    },

    /// The match is over; `winner_player_id` is `null` on a draw.
    GameOver {
        room_id: RoomId,
        winner_player_id: Option<PlayerId>,
        players: Vec<PlayerView>,
    },

    /// A request failed. `message` is one of a fixed set of strings.
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Message type as it appears on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "room_created",
            Self::RoomJoined { .. } => "room_joined",
            Self::RoomState { .. } => "room_state",
            Self::RoundResult { .. } => "round_result",
            Self::GameOver { .. } => "game_over",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
