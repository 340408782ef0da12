//! Bot opponents.

use std::fmt;
use std::str::FromStr;

use cardduel_protocol::Action;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::{BattleRules, Fighter};

/// How a bot picks its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStrategy {
    /// Uniform over the actions it can afford.
    Random,
    /// Reads both fighters' stamina and HP before choosing.
    #[default]
    Tactical,
}

impl BotStrategy {
    /// Picks an action the bot can afford. Never fails.
    pub fn choose_action(
        self,
        rules: &BattleRules,
        me: &Fighter,
        opponent: &Fighter,
        rng: &mut impl Rng,
    ) -> Action {
        match self {
            Self::Random => rules
                .affordable(me)
                .choose(rng)
                .copied()
                .unwrap_or(Action::Rest),
            Self::Tactical => tactical(rules, me, opponent, rng),
        }
    }
}

fn tactical(rules: &BattleRules, me: &Fighter, opponent: &Fighter, rng: &mut impl Rng) -> Action {
    let can_attack = rules.can_afford(me, Action::Attack);
    let can_defend = rules.can_afford(me, Action::Defend);
    let opponent_can_attack = rules.can_afford(opponent, Action::Attack);

    // Opponent is out of stamina and must rest.
    if !rules.can_afford(opponent, Action::Defend) {
        return if can_attack { Action::Attack } else { Action::Rest };
    }

    if !opponent_can_attack {
        if can_attack && rng.random_bool(0.7) {
            return Action::Attack;
        }
        return Action::Rest;
    }

    if !can_attack {
        // Resting into an attack costs the most HP.
        if can_defend && rng.random_bool(0.6) {
            return Action::Defend;
        }
        return Action::Rest;
    }

    let low_hp = me.hp <= rules.hit_damage;
    if low_hp && can_defend && rng.random_bool(0.6) {
        return Action::Defend;
    }

    match rng.random_range(0..10) {
        0..=4 => Action::Attack,
        5..=7 => Action::Defend,
        _ => Action::Rest,
    }
}

impl fmt::Display for BotStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Random => "random",
            Self::Tactical => "tactical",
        })
    }
}

/// Returned when parsing an unknown strategy name.
#[derive(Debug, thiserror::Error)]
#[error("unknown bot strategy `{0}` (expected `random` or `tactical`)")]
pub struct UnknownStrategy(String);

impl FromStr for BotStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "tactical" => Ok(Self::Tactical),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}
