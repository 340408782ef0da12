//! Round resolution.
//!
//! Each side's outcome is computed by the same function from its own
//! perspective, so swapping the two inputs swaps the two outputs and
//! nothing else. Arrival order of the actions never matters.

use cardduel_protocol::Action;

use crate::{BattleRules, Fighter};

/// Which seat an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// What happened to one fighter in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideOutcome {
    /// The action actually played.
    pub action: Action,
    /// The submitted action was unaffordable and became `Rest`.
    pub forced: bool,
    pub damage_taken: u32,
    pub healed: u32,
    /// State after the round.
    pub fighter: Fighter,
}

/// Both sides of a resolved round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub first: SideOutcome,
    pub second: SideOutcome,
    /// The side that took strictly less damage, if any.
    pub round_winner: Option<Side>,
}

impl Resolution {
    pub fn side(&self, side: Side) -> &SideOutcome {
        match side {
            Side::First => &self.first,
            Side::Second => &self.second,
        }
    }
}

impl BattleRules {
    /// The action `fighter` will actually play, and whether it was forced.
    pub fn effective_action(&self, fighter: &Fighter, requested: Action) -> (Action, bool) {
        if self.can_afford(fighter, requested) {
            (requested, false)
        } else {
            (Action::Rest, true)
        }
    }

    /// Resolves one round.
    pub fn resolve(
        &self,
        first_action: Action,
        second_action: Action,
        first: Fighter,
        second: Fighter,
    ) -> Resolution {
        let (first_played, first_forced) = self.effective_action(&first, first_action);
        let (second_played, second_forced) = self.effective_action(&second, second_action);

        let first = self.apply(first, first_played, first_forced, second_played);
        let second = self.apply(second, second_played, second_forced, first_played);

        let round_winner = match first.damage_taken.cmp(&second.damage_taken) {
            std::cmp::Ordering::Less => Some(Side::First),
            std::cmp::Ordering::Greater => Some(Side::Second),
            std::cmp::Ordering::Equal => None,
        };

        Resolution {
            first,
            second,
            round_winner,
        }
    }

    fn apply(&self, fighter: Fighter, own: Action, forced: bool, opponent: Action) -> SideOutcome {
        let damage_taken = self.damage_taken(own, opponent).min(fighter.hp);
        let mut hp = fighter.hp - damage_taken;

        let mut stamina = fighter.stamina - self.cost(own);
        let mut healed = 0;
        if own == Action::Rest {
            stamina = (stamina + self.rest_recovery).min(self.max_stamina);
            if damage_taken == 0 {
                healed = self.rest_heal.min(self.max_hp.saturating_sub(hp));
                hp += healed;
            }
        }

        SideOutcome {
            action: own,
            forced,
            damage_taken,
            healed,
            fighter: Fighter { hp, stamina },
        }
    }
}
