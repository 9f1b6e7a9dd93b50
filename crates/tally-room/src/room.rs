//! Room actor: a Tokio task that owns one [`VotingRoom`].
//!
//! The outside world talks to the actor through [`RoomHandle`], a thin
//! wrapper around a bounded mpsc sender. Commands are processed one at a
//! time, so everything that happens inside a room is serialized without
//! locks.

use std::collections::HashMap;

use tally_protocol::{
    ConnectionId, Recipient, RoomAction, RoomEvent, RoomId, RoomSnapshot,
    VotingPhase,
};
use tokio::sync::{mpsc, oneshot};

use crate::voting::Outbound;
use crate::{RoomError, VotingRoom};

/// Channel sender for delivering room events to one participant's
/// connection handler.
pub type ParticipantSender = mpsc::UnboundedSender<RoomEvent>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        connection_id: ConnectionId,
        name: String,
        sender: ParticipantSender,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Replies with the number of participants left.
    Leave {
        connection_id: ConnectionId,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    /// A voting action. No reply: refusals are silent.
    Action {
        sender: ConnectionId,
        action: RoomAction,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    GetSnapshot {
        connection_id: ConnectionId,
        reply: oneshot::Sender<RoomSnapshot>,
    },

    Shutdown,
}

/// Room metadata, without participant details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: VotingPhase,
    pub participant_count: usize,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The [`RoomManager`](crate::RoomManager) holds one per
/// room; callers clone it to talk to the room without holding the
/// manager lock.
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

    /// Adds a participant and returns the room as they see it.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        name: String,
        sender: ParticipantSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            connection_id,
            name,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a participant. Returns how many participants remain.
    pub async fn leave(
        &self,
        connection_id: ConnectionId,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            connection_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Delivers a voting action (fire-and-forget).
    pub async fn send_action(
        &self,
        sender: ConnectionId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Action { sender, action }).await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// The room as `connection_id` would see it.
    pub async fn snapshot(
        &self,
        connection_id: ConnectionId,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetSnapshot {
            connection_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

struct RoomActor {
    room: VotingRoom,
    senders: HashMap<ConnectionId, ParticipantSender>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.room_id(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    connection_id,
                    name,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(connection_id, name, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave {
                    connection_id,
                    reply,
                } => {
                    let result = self.handle_leave(connection_id);
                    let _ = reply.send(result);
                }
                RoomCommand::Action { sender, action } => {
                    self.handle_action(sender, action);
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::GetSnapshot {
                    connection_id,
                    reply,
                } => {
                    let _ = reply.send(self.room.snapshot(connection_id));
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_id = %self.room.room_id(), "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room_id = %self.room.room_id(), "room actor stopped");
    }

    fn handle_join(
        &mut self,
        connection_id: ConnectionId,
        name: String,
        sender: ParticipantSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let out = self.room.join(connection_id, name)?;
        self.senders.insert(connection_id, sender);

        tracing::info!(
            room_id = %self.room.room_id(),
            %connection_id,
            participants = self.room.len(),
            "participant joined"
        );

        self.dispatch(out);
        Ok(self.room.snapshot(connection_id))
    }

    fn handle_leave(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<usize, RoomError> {
        let out = self.room.leave(connection_id)?;
        self.senders.remove(&connection_id);

        tracing::info!(
            room_id = %self.room.room_id(),
            %connection_id,
            participants = self.room.len(),
            "participant left"
        );

        self.dispatch(out);
        Ok(self.room.len())
    }

    fn handle_action(&mut self, sender: ConnectionId, action: RoomAction) {
        match self.room.apply(sender, action) {
            Ok(out) => self.dispatch(out),
            Err(reason) => {
                tracing::debug!(
                    room_id = %self.room.room_id(),
                    %sender,
                    %reason,
                    "action refused"
                );
            }
        }
    }

    /// Delivers events to their recipients. `All` means everyone in the
    /// room after the operation.
    fn dispatch(&self, out: Outbound) {
        for (recipient, event) in out {
            match recipient {
                Recipient::All => {
                    for p in self.room.participants() {
                        self.send_to(p.connection_id, event.clone());
                    }
                }
                Recipient::Participant(conn) => self.send_to(conn, event),
            }
        }
    }

    /// Silently drops the event if the receiver is gone.
    fn send_to(&self, connection_id: ConnectionId, event: RoomEvent) {
        if let Some(sender) = self.senders.get(&connection_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room.room_id().clone(),
            phase: self.room.phase(),
            participant_count: self.room.len(),
        }
    }
}

/// Spawns a room actor for an empty room and returns its handle.
///
/// A `channel_size` of zero is treated as one.
pub(crate) fn spawn_room(room_id: RoomId, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));

    let actor = RoomActor {
        room: VotingRoom::new(room_id.clone()),
        senders: HashMap::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
