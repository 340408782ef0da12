//! The duel state machine.
//!
//! `DuelRoom` owns everything about one room and is mutated only by the
//! room actor, one command at a time. Every operation returns the
//! `(Recipient, ServerMessage)` pairs to deliver; the actor does the I/O.

use cardduel_battle::{BattleRules, BotStrategy, Fighter, Resolution, Side};
use cardduel_protocol::{
    Action, LobbyPlayer, PlayerId, PlayerView, Recipient, RoomId, RoomStatus, RoomSummary,
    RoundOutcome, ServerMessage,
};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::ids::player_id;
use crate::{RoomConfig, RoomError};

/// Messages produced by one state transition.
pub type Outbound = Vec<(Recipient, ServerMessage)>;

/// One occupied seat.
#[derive(Debug, Clone)]
pub struct Seat {
    pub player_id: PlayerId,
    pub name: String,
    pub is_bot: bool,
    pub fighter: Fighter,
    /// Locked-in action for the current round.
    pub action: Option<Action>,
    pub wins: u32,
}

impl Seat {
    fn new(name: String, is_bot: bool, rules: &BattleRules) -> Self {
        Self {
            player_id: player_id(is_bot),
            name,
            is_bot,
            fighter: rules.fresh_fighter(),
            action: None,
            wins: 0,
        }
    }
}

/// State of one room.
#[derive(Debug)]
pub struct DuelRoom {
    room_id: RoomId,
    status: RoomStatus,
    round: u32,
    seats: Vec<Seat>,
    has_bot: bool,
    /// Set once the first match starts; decides how an empty room expires.
    started: bool,
    created_at: DateTime<Utc>,
    rules: BattleRules,
    bot: BotStrategy,
    rng: StdRng,
}

impl DuelRoom {
    /// Opens a room with its creator seated.
    ///
    /// With `with_bot` the bot takes the second seat and the match starts
    /// at once. The creator receives `room_created` before the first
    /// `room_state`.
    pub fn open(
        room_id: RoomId,
        creator_name: String,
        with_bot: bool,
        config: &RoomConfig,
    ) -> (Self, PlayerId, Outbound) {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let creator = Seat::new(creator_name, false, &config.rules);
        let creator_id = creator.player_id.clone();

        let mut room = Self {
            room_id,
            status: RoomStatus::Waiting,
            round: 1,
            seats: vec![creator],
            has_bot: with_bot,
            started: false,
            created_at: Utc::now(),
            rules: config.rules.clone(),
            bot: config.bot,
            rng,
        };

        let mut out = vec![(
            Recipient::Player(creator_id.clone()),
            ServerMessage::RoomCreated {
                room_id: room.room_id.clone(),
                player_id: creator_id.clone(),
            },
        )];
        if with_bot {
            let bot = Seat::new(config.bot_name.clone(), true, &room.rules);
            room.seats.push(bot);
            room.start_match();
        }
        out.push((Recipient::All, room.state_message()));
        (room, creator_id, out)
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Seated non-bot players.
    pub fn human_count(&self) -> usize {
        self.seats.iter().filter(|s| !s.is_bot).count()
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Seats a new player in the free seat and starts the match.
    ///
    /// A finished room is reported as finished even when both seats are
    /// still taken.
    pub fn join(&mut self, name: String) -> Result<(PlayerId, Outbound), RoomError> {
        if self.status == RoomStatus::Finished {
            return Err(RoomError::RoomFinished(self.room_id.clone()));
        }
        if !self.status.is_joinable() || self.seats.len() >= 2 {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }

        let seat = Seat::new(name, false, &self.rules);
        let joined = seat.player_id.clone();
        self.seats.push(seat);
        if self.seats.len() == 2 {
            self.start_match();
        }

        let out = vec![
            (
                Recipient::Player(joined.clone()),
                ServerMessage::RoomJoined {
                    room_id: self.room_id.clone(),
                    player_id: joined.clone(),
                },
            ),
            (Recipient::All, self.state_message()),
        ];
        Ok((joined, out))
    }

    /// Locks in a player's action for `round`.
    ///
    /// The first action of a round produces no messages. When the second
    /// arrives (or a bot fills its seat) the round resolves.
    pub fn play_action(
        &mut self,
        player: &PlayerId,
        round: u32,
        action: Action,
    ) -> Result<Outbound, RoomError> {
        let idx = self.seat_index(player)?;
        if self.status != RoomStatus::Playing {
            return Err(RoomError::NotPlaying(self.room_id.clone()));
        }
        if round != self.round {
            return Err(RoomError::StaleAction {
                room_id: self.room_id.clone(),
                expected: self.round,
                received: round,
            });
        }
        if self.seats[idx].action.is_some() {
            return Err(RoomError::AlreadySubmitted(player.clone(), round));
        }

        self.seats[idx].action = Some(action);
        self.fill_bot_action();

        if self.seats.iter().all(|s| s.action.is_some()) {
            Ok(self.resolve_round())
        } else {
            Ok(Vec::new())
        }
    }

    /// Handles a rematch request.
    ///
    /// With both seats still taken a new match starts right away. If the
    /// opponent has left, the requester gets a snapshot showing the room
    /// waiting. During a match the request is ignored.
    pub fn rematch(&mut self, player: &PlayerId) -> Result<Outbound, RoomError> {
        self.seat_index(player)?;
        match self.status {
            RoomStatus::Finished if self.seats.len() == 2 => {
                self.set_status(RoomStatus::Waiting);
                self.start_match();
                Ok(vec![(Recipient::All, self.state_message())])
            }
            RoomStatus::Finished | RoomStatus::Waiting => {
                if self.status == RoomStatus::Finished {
                    self.reset_to_waiting();
                }
                Ok(vec![(Recipient::Player(player.clone()), self.state_message())])
            }
            RoomStatus::Playing => Ok(Vec::new()),
        }
    }

    /// Vacates a player's seat.
    ///
    /// An interrupted match goes back to waiting. A finished room stays
    /// finished until someone still seated asks for a rematch; the
    /// one-player snapshot is enough for the client to leave the battle
    /// view.
    pub fn leave(&mut self, player: &PlayerId) -> Result<Outbound, RoomError> {
        let idx = self.seat_index(player)?;
        self.seats.remove(idx);
        if self.status == RoomStatus::Playing {
            self.reset_to_waiting();
        }
        if self.human_count() == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![(Recipient::All, self.state_message())])
    }

    // -----------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------

    pub fn state_message(&self) -> ServerMessage {
        ServerMessage::RoomState {
            room_id: self.room_id.clone(),
            status: self.status,
            round: self.round,
            has_bot: self.has_bot,
            players: self.player_views(),
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            status: self.status,
            players_count: self.seats.len(),
            has_bot: self.has_bot,
            players: self
                .seats
                .iter()
                .map(|s| LobbyPlayer {
                    name: s.name.clone(),
                    is_bot: s.is_bot,
                })
                .collect(),
            created_at: self.created_at,
        }
    }

    fn player_views(&self) -> Vec<PlayerView> {
        self.seats
            .iter()
            .map(|s| PlayerView {
                player_id: s.player_id.clone(),
                name: s.name.clone(),
                is_bot: s.is_bot,
                hp: s.fighter.hp,
                max_hp: self.rules.max_hp,
                stamina: s.fighter.stamina,
                max_stamina: self.rules.max_stamina,
                wins: s.wins,
                has_acted: s.action.is_some(),
            })
            .collect()
    }

    // -----------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------

    fn seat_index(&self, player: &PlayerId) -> Result<usize, RoomError> {
        self.seats
            .iter()
            .position(|s| &s.player_id == player)
            .ok_or_else(|| RoomError::NotInRoom(player.clone(), self.room_id.clone()))
    }

    fn set_status(&mut self, next: RoomStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal transition {} -> {}",
            self.status,
            next
        );
        tracing::debug!(room_id = %self.room_id, from = %self.status, to = %next, "room status");
        self.status = next;
    }

    fn reset_match(&mut self) {
        self.round = 1;
        for seat in &mut self.seats {
            seat.fighter = self.rules.fresh_fighter();
            seat.action = None;
        }
    }

    fn start_match(&mut self) {
        debug_assert_eq!(self.seats.len(), 2);
        self.reset_match();
        self.set_status(RoomStatus::Playing);
        self.started = true;
        tracing::info!(room_id = %self.room_id, "match started");
    }

    fn reset_to_waiting(&mut self) {
        self.reset_match();
        self.set_status(RoomStatus::Waiting);
    }

    fn fill_bot_action(&mut self) {
        let Some(bot_idx) = self.seats.iter().position(|s| s.is_bot && s.action.is_none())
        else {
            return;
        };
        let opponent = self.seats[1 - bot_idx].fighter;
        let me = self.seats[bot_idx].fighter;
        let action = self.bot.choose_action(&self.rules, &me, &opponent, &mut self.rng);
        self.seats[bot_idx].action = Some(action);
    }

    fn resolve_round(&mut self) -> Outbound {
        let (Some(first_action), Some(second_action)) = (
            self.seats[0].action.take(),
            self.seats[1].action.take(),
        ) else {
            return Vec::new();
        };

        let resolution = self.rules.resolve(
            first_action,
            second_action,
            self.seats[0].fighter,
            self.seats[1].fighter,
        );
        self.seats[0].fighter = resolution.first.fighter;
        self.seats[1].fighter = resolution.second.fighter;

        let played = self.round;
        tracing::debug!(
            room_id = %self.room_id,
            round = played,
            first = %resolution.first.action,
            second = %resolution.second.action,
            "round resolved"
        );

        let mut out = vec![(Recipient::All, self.round_result(played, &resolution))];

        let (first, second) = (self.seats[0].fighter, self.seats[1].fighter);
        if self.rules.is_terminal(played, &first, &second) {
            self.set_status(RoomStatus::Finished);
            let winner = self.rules.verdict(&first, &second).map(|side| {
                let seat = &mut self.seats[side_index(side)];
                seat.wins += 1;
                seat.player_id.clone()
            });
            tracing::info!(
                room_id = %self.room_id,
                round = played,
                winner = winner.as_ref().map(PlayerId::as_str).unwrap_or("draw"),
                "match finished"
            );
            out.push((
                Recipient::All,
                ServerMessage::GameOver {
                    room_id: self.room_id.clone(),
                    winner_player_id: winner,
                    players: self.player_views(),
                },
            ));
        } else {
            self.round += 1;
            out.push((Recipient::All, self.state_message()));
        }
        out
    }

    fn round_result(&self, round: u32, resolution: &Resolution) -> ServerMessage {
        let outcomes = [Side::First, Side::Second]
            .into_iter()
            .map(|side| {
                let outcome = resolution.side(side);
                RoundOutcome {
                    player_id: self.seats[side_index(side)].player_id.clone(),
                    action: outcome.action,
                    forced: outcome.forced,
                    damage_taken: outcome.damage_taken,
                    healed: outcome.healed,
                    hp: outcome.fighter.hp,
                    stamina: outcome.fighter.stamina,
                }
            })
            .collect();
        ServerMessage::RoundResult {
            room_id: self.room_id.clone(),
            round,
            winner_player_id: resolution
                .round_winner
                .map(|side| self.seats[side_index(side)].player_id.clone()),
            outcomes,
        }
    }
}

fn side_index(side: Side) -> usize {
    match side {
        Side::First => 0,
        Side::Second => 1,
    }
}
