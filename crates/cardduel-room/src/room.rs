//! Room actor: an isolated Tokio task that owns one [`DuelRoom`].
//!
//! Commands arrive on an mpsc channel and run one at a time, so every
//! state change in a room is atomic with respect to every other. Outbound
//! messages go to per-player unbounded channels and never block the actor.

use std::collections::HashMap;

use cardduel_protocol::{Action, PlayerId, Recipient, RoomId, RoomSummary, ServerMessage};
use tokio::sync::{mpsc, oneshot};

use crate::duel::{DuelRoom, Outbound};
use crate::idle::Deadline;
use crate::{RoomConfig, RoomError};

/// Channel sender for delivering server messages to one player's
/// connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<PlayerId, RoomError>>,
    },
    PlayAction {
        player_id: PlayerId,
        round: u32,
        action: Action,
    },
    Rematch {
        player_id: PlayerId,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Summary {
        reply: oneshot::Sender<RoomSummary>,
    },
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The [`RoomManager`](crate::RoomManager) keeps one per
/// room and connection handlers keep one for the seat they hold.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Takes the free seat. Returns the new player's id.
    pub async fn join(
        &self,
        player_name: String,
        sender: PlayerSender,
    ) -> Result<PlayerId, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_name,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Submits an action (fire-and-forget; rejected actions are dropped).
    pub async fn play_action(
        &self,
        player_id: PlayerId,
        round: u32,
        action: Action,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::PlayAction {
            player_id,
            round,
            action,
        })
        .await
    }

    /// Requests a rematch (fire-and-forget).
    pub async fn rematch(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.send(RoomCommand::Rematch { player_id }).await
    }

    /// Vacates a player's seat.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            player_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Lobby projection of the room.
    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Summary { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Tells the room to stop without waiting for the channel.
    pub fn request_shutdown(&self) {
        let _ = self.sender.try_send(RoomCommand::Shutdown);
    }
}

/// What the actor loop does after a command.
enum Flow {
    /// Keep running; `touched` marks activity that resets expiry.
    Continue { touched: bool },
    Stop,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    duel: DuelRoom,
    config: RoomConfig,
    senders: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<RoomCommand>,
    expiry: Deadline,
    /// Tells the manager this room has stopped.
    closed: mpsc::UnboundedSender<RoomId>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.duel.room_id(), "room actor started");

        loop {
            let expiry = self.expiry;
            let flow = tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => Flow::Stop,
                },
                _ = expiry.wait() => {
                    tracing::info!(
                        room_id = %self.duel.room_id(),
                        status = %self.duel.status(),
                        "room expired"
                    );
                    Flow::Stop
                }
            };

            match flow {
                Flow::Stop => break,
                Flow::Continue { touched: true } => {
                    if self.should_close_now() {
                        tracing::info!(
                            room_id = %self.duel.room_id(),
                            "room emptied before a match started"
                        );
                        break;
                    }
                    self.refresh_expiry();
                }
                Flow::Continue { touched: false } => {}
            }
        }

        let _ = self.closed.send(self.duel.room_id().clone());
        tracing::info!(room_id = %self.duel.room_id(), "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::Join {
                player_name,
                sender,
                reply,
            } => {
                let result = match self.duel.join(player_name) {
                    Ok((player_id, out)) => {
                        self.senders.insert(player_id.clone(), sender);
                        tracing::info!(
                            room_id = %self.duel.room_id(),
                            %player_id,
                            players = self.duel.seats().len(),
                            "player joined"
                        );
                        self.dispatch(out);
                        Ok(player_id)
                    }
                    Err(e) => Err(e),
                };
                let touched = result.is_ok();
                let _ = reply.send(result);
                Flow::Continue { touched }
            }
            RoomCommand::PlayAction {
                player_id,
                round,
                action,
            } => match self.duel.play_action(&player_id, round, action) {
                Ok(out) => {
                    self.dispatch(out);
                    Flow::Continue { touched: true }
                }
                Err(e) => {
                    tracing::debug!(
                        room_id = %self.duel.room_id(),
                        %player_id,
                        error = %e,
                        "action dropped"
                    );
                    Flow::Continue { touched: false }
                }
            },
            RoomCommand::Rematch { player_id } => match self.duel.rematch(&player_id) {
                Ok(out) => {
                    self.dispatch(out);
                    Flow::Continue { touched: true }
                }
                Err(e) => {
                    tracing::debug!(
                        room_id = %self.duel.room_id(),
                        %player_id,
                        error = %e,
                        "rematch dropped"
                    );
                    Flow::Continue { touched: false }
                }
            },
            RoomCommand::Leave { player_id, reply } => {
                let result = match self.duel.leave(&player_id) {
                    Ok(out) => {
                        self.senders.remove(&player_id);
                        tracing::info!(
                            room_id = %self.duel.room_id(),
                            %player_id,
                            humans = self.duel.human_count(),
                            "player left"
                        );
                        self.dispatch(out);
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                let touched = result.is_ok();
                let _ = reply.send(result);
                Flow::Continue { touched }
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send(self.duel.summary());
                Flow::Continue { touched: false }
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.duel.room_id(), "room shutting down");
                Flow::Stop
            }
        }
    }

    /// A room nobody ever played in closes as soon as it is empty.
    fn should_close_now(&self) -> bool {
        self.duel.human_count() == 0 && !self.duel.has_started()
    }

    fn refresh_expiry(&mut self) {
        use cardduel_protocol::RoomStatus;

        if self.duel.human_count() == 0 {
            self.expiry.arm(self.config.reconnect_grace);
        } else if self.duel.status() == RoomStatus::Finished {
            self.expiry.arm(self.config.finished_ttl);
        } else if self.expiry.is_armed() {
            self.expiry.disarm();
        }
    }

    /// Delivers messages. Bots have no sender and are skipped.
    fn dispatch(&self, out: Outbound) {
        for (recipient, msg) in out {
            match recipient {
                Recipient::All => {
                    for seat in self.duel.seats() {
                        self.send_to(&seat.player_id, msg.clone());
                    }
                }
                Recipient::Player(player_id) => self.send_to(&player_id, msg),
            }
        }
    }

    /// A closed receiver means the player's connection is gone; the
    /// message is dropped and the other player is unaffected.
    fn send_to(&self, player_id: &PlayerId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(player_id) {
            let _ = sender.send(msg);
        }
    }
}

/// Opens a room with its creator seated and spawns its actor.
///
/// The creator's `room_created` and first `room_state` are queued on
/// `creator` before this returns.
pub(crate) fn spawn_room(
    room_id: RoomId,
    creator_name: String,
    creator: PlayerSender,
    with_bot: bool,
    config: RoomConfig,
    closed: mpsc::UnboundedSender<RoomId>,
) -> (RoomHandle, PlayerId) {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let (duel, creator_id, out) = DuelRoom::open(room_id.clone(), creator_name, with_bot, &config);

    let mut actor = RoomActor {
        duel,
        config,
        senders: HashMap::from([(creator_id.clone(), creator)]),
        receiver: rx,
        expiry: Deadline::default(),
        closed,
    };
    actor.dispatch(out);
    actor.refresh_expiry();

    tokio::spawn(actor.run());

    (
        RoomHandle {
            room_id,
            sender: tx,
        },
        creator_id,
    )
}
