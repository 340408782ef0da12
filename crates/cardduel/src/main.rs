use std::time::Duration;

use cardduel::prelude::*;
use clap::Parser;

/// CardDuel server - two-player card duels over WebSocket
#[derive(Parser, Debug)]
#[command(name = "cardduel-server", version, about)]
struct Args {
    /// Address serving the lobby and the game socket; overrides --port
    #[arg(long, env = "CARDDUEL_BIND")]
    bind: Option<String>,

    /// Port to listen on, all interfaces
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Path the WebSocket upgrade is served on
    #[arg(long, env = "CARDDUEL_WS_PATH", default_value = DEFAULT_WS_PATH)]
    ws_path: String,

    /// Seconds between pings on each game socket
    #[arg(long, env = "CARDDUEL_PING_INTERVAL_SECS", default_value_t = 30)]
    ping_interval_secs: u64,

    /// Seconds without any frame before a socket is dropped
    #[arg(long, env = "CARDDUEL_IDLE_TIMEOUT_SECS", default_value_t = 90)]
    idle_timeout_secs: u64,

    /// Seconds a started room survives with no human seated
    #[arg(long, env = "CARDDUEL_RECONNECT_GRACE_SECS", default_value_t = 30)]
    reconnect_grace_secs: u64,

    /// Seconds a finished room survives without activity
    #[arg(long, env = "CARDDUEL_FINISHED_TTL_SECS", default_value_t = 120)]
    finished_ttl_secs: u64,

    /// Round cap per match
    #[arg(long, env = "CARDDUEL_MAX_ROUNDS", default_value_t = 20)]
    max_rounds: u32,

    /// Bot strategy: random or tactical
    #[arg(long, env = "CARDDUEL_BOT", default_value = "tactical")]
    bot: BotStrategy,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let bind = self
            .bind
            .unwrap_or_else(|| format!("0.0.0.0:{}", self.port));
        let ping_interval = Duration::from_secs(self.ping_interval_secs.max(1));
        ServerConfig {
            bind,
            ws_path: self.ws_path,
            ping_interval,
            connection_idle_timeout: Duration::from_secs(self.idle_timeout_secs)
                .max(ping_interval * 2),
            room: RoomConfig {
                reconnect_grace: Duration::from_secs(self.reconnect_grace_secs),
                finished_ttl: Duration::from_secs(self.finished_ttl_secs),
                rules: BattleRules {
                    max_rounds: self.max_rounds.max(1),
                    ..BattleRules::default()
                },
                bot: self.bot,
                ..RoomConfig::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cardduel=info,cardduel_room=info,cardduel_session=info,cardduel_transport=info"
                    .into()
            }),
        )
        .init();

    let config = Args::parse().into_config();
    tracing::info!(
        addr = %config.bind,
        ws_path = %config.ws_path,
        bot = %config.room.bot,
        "starting cardduel server"
    );

    let server = CardDuelServer::builder().config(config).build().await?;
    server.run().await?;
    Ok(())
}
