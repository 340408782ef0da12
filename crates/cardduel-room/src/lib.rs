//! Duel rooms for CardDuel.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! [`DuelRoom`] state machine. Commands are processed one at a time, so a
//! round never resolves twice and never interleaves with a join or leave.
//!
//! # Key types
//!
//! - [`DuelRoom`] — waiting/playing/finished state machine for one room
//! - [`RoomManager`] — the room store: creates, finds and removes rooms
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomConfig`] — expiry windows, combat rules and bot settings

mod config;
mod duel;
mod error;
mod idle;
mod ids;
mod manager;
mod room;

pub use config::RoomConfig;
pub use duel::{DuelRoom, Outbound, Seat};
pub use error::RoomError;
pub use ids::{MAX_ID_ATTEMPTS, RandomRoomCodes, RoomCodes};
pub use manager::{RoomManager, collect_summaries};
pub use room::{PlayerSender, RoomHandle};
