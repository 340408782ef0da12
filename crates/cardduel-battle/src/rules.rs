//! The payoff table and resource limits.

use cardduel_protocol::Action;
use serde::{Deserialize, Serialize};

use crate::{Fighter, Side};

/// Tunable combat numbers.
///
/// Damage a fighter takes depends on its own action and the opponent's:
///
/// ```text
///  own \ opp | attack  defend  rest
/// -----------+---------------------
///  attack    |   2       1      0
///  defend    |   0       0      0
///  rest      |   3       0      0
/// ```
///
/// Attack beats rest, defend beats attack (the attacker takes a counter),
/// and rest beats defend on resources: the rester regains stamina and heals
/// while the defender pays for a block that stopped nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRules {
    pub max_hp: u32,
    pub max_stamina: u32,
    pub starting_stamina: u32,

    pub attack_cost: u32,
    pub defend_cost: u32,
    /// Stamina regained by resting.
    pub rest_recovery: u32,
    /// HP regained by resting when not hit that round.
    pub rest_heal: u32,

    /// Attack vs attack, taken by both.
    pub clash_damage: u32,
    /// Taken by an attacker whose target defended.
    pub counter_damage: u32,
    /// Taken by a rester who was attacked.
    pub hit_damage: u32,

    /// The match ends after this round even if both fighters stand.
    pub max_rounds: u32,
}

impl Default for BattleRules {
    fn default() -> Self {
        Self {
            max_hp: 10,
            max_stamina: 5,
            starting_stamina: 3,
            attack_cost: 2,
            defend_cost: 1,
            rest_recovery: 2,
            rest_heal: 1,
            clash_damage: 2,
            counter_damage: 1,
            hit_damage: 3,
            max_rounds: 20,
        }
    }
}

impl BattleRules {
    /// A fighter at the start of a match.
    pub fn fresh_fighter(&self) -> Fighter {
        Fighter {
            hp: self.max_hp,
            stamina: self.starting_stamina.min(self.max_stamina),
        }
    }

    /// Stamina spent to play `action`.
    pub fn cost(&self, action: Action) -> u32 {
        match action {
            Action::Attack => self.attack_cost,
            Action::Defend => self.defend_cost,
            Action::Rest => 0,
        }
    }

    pub fn can_afford(&self, fighter: &Fighter, action: Action) -> bool {
        fighter.stamina >= self.cost(action)
    }

    /// Actions `fighter` can pay for. Always contains `Rest`.
    pub fn affordable(&self, fighter: &Fighter) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| self.can_afford(fighter, *action))
            .collect()
    }

    /// Damage taken by a fighter playing `own` against `opponent`.
    pub fn damage_taken(&self, own: Action, opponent: Action) -> u32 {
        match (own, opponent) {
            (Action::Attack, Action::Attack) => self.clash_damage,
            (Action::Attack, Action::Defend) => self.counter_damage,
            (Action::Rest, Action::Attack) => self.hit_damage,
            _ => 0,
        }
    }

    /// Returns `true` once the match is over after `round` was played.
    pub fn is_terminal(&self, round: u32, first: &Fighter, second: &Fighter) -> bool {
        first.is_down() || second.is_down() || round >= self.max_rounds
    }

    /// Winner of a finished match: more HP wins, equal HP is a draw.
    pub fn verdict(&self, first: &Fighter, second: &Fighter) -> Option<Side> {
        match first.hp.cmp(&second.hp) {
            std::cmp::Ordering::Greater => Some(Side::First),
            std::cmp::Ordering::Less => Some(Side::Second),
            std::cmp::Ordering::Equal => None,
        }
    }
}
