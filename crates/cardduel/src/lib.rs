//! # CardDuel
//!
//! A server for two-player card duels played over WebSocket.
//!
//! Players create or join rooms, lock in an action each round (attack,
//! defend or rest), and the server resolves both actions at once. A room
//! may seat a bot instead of a second human. Open rooms are listed over
//! HTTP for the lobby, on the same port as the game socket.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardduel::prelude::*;
//!
//! # async fn start() -> Result<(), CardDuelError> {
//! let server = CardDuelServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod lobby;
mod server;

pub use config::{DEFAULT_WS_PATH, ServerConfig};
pub use error::CardDuelError;
pub use lobby::ROOMS_PATH;
pub use server::{CardDuelServer, CardDuelServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{
        CardDuelError, CardDuelServer, CardDuelServerBuilder, DEFAULT_WS_PATH, ROOMS_PATH,
        ServerConfig,
    };
    pub use cardduel_battle::{BattleRules, BotStrategy};
    pub use cardduel_protocol::{
        Action, ClientMessage, PlayerId, RoomId, RoomStatus, RoomSummary, ServerMessage,
    };
    pub use cardduel_room::RoomConfig;
}
