//! Connection identity for the card duel server.
//!
//! A WebSocket connection carries no identity of its own. When a client
//! creates or joins a room the server records which player seat and room
//! that connection now speaks for, and every later `play_action` or
//! `rematch` is checked against that record.
//!
//! ```text
//! Room Layer (above)     ← seats, rounds, broadcasts
//!     ↕
//! Session Layer (here)   ← ConnectionId → (PlayerId, RoomId)
//!     ↕
//! Transport (below)      ← ConnectionId
//! ```

mod error;
mod registry;

pub use error::RegistryError;
pub use registry::{Binding, ConnectionRegistry};
