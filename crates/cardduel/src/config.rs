//! Server configuration.

use std::time::Duration;

use cardduel_room::RoomConfig;

/// Path the WebSocket upgrade is served on.
pub const DEFAULT_WS_PATH: &str = "/api/20250120_card-game01/ws";

/// Everything a [`CardDuelServer`](crate::CardDuelServer) needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the single listener serving the lobby and the game socket.
    pub bind: String,
    /// Route of the WebSocket upgrade.
    pub ws_path: String,
    /// How often each game socket is pinged.
    pub ping_interval: Duration,
    /// A socket that sends nothing, pongs included, for this long is closed.
    pub connection_idle_timeout: Duration,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            ws_path: DEFAULT_WS_PATH.to_string(),
            ping_interval: Duration::from_secs(30),
            connection_idle_timeout: Duration::from_secs(90),
            room: RoomConfig::default(),
        }
    }
}
