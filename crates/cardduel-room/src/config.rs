//! Room configuration.

use std::time::Duration;

use cardduel_battle::{BattleRules, BotStrategy};
use serde::{Deserialize, Serialize};

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How long a room that has started a match survives with no human
    /// seated, so a dropped player can rejoin.
    pub reconnect_grace: Duration,

    /// How long a finished room survives without activity.
    pub finished_ttl: Duration,

    /// Combat numbers used for every match.
    pub rules: BattleRules,

    /// How bots choose actions.
    pub bot: BotStrategy,

    /// Display name given to bot seats.
    pub bot_name: String,

    /// Seed for bot decisions. `None` seeds each room from the OS.
    pub rng_seed: Option<u64>,

    /// Command channel capacity per room actor.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(30),
            finished_ttl: Duration::from_secs(120),
            rules: BattleRules::default(),
            bot: BotStrategy::default(),
            bot_name: "Bot".to_string(),
            rng_seed: None,
            channel_size: 64,
        }
    }
}
