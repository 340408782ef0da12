//! Combat rules for a card duel.
//!
//! Everything here is synchronous and side-effect free: the room actor
//! feeds in two actions and two [`Fighter`]s and gets back a
//! [`Resolution`]. Bots pick their action through [`BotStrategy`] using a
//! caller-supplied RNG, so seeded tests are reproducible.
//!
//! # Key types
//!
//! - [`BattleRules`] — the payoff table, resource caps, and round limit
//! - [`Fighter`] — one side's hit points and stamina
//! - [`Resolution`] — both sides' outcomes for a round
//! - [`BotStrategy`] — how a bot chooses its action

mod bot;
mod fighter;
mod resolver;
mod rules;

pub use bot::{BotStrategy, UnknownStrategy};
pub use fighter::Fighter;
pub use resolver::{Resolution, Side, SideOutcome};
pub use rules::BattleRules;
