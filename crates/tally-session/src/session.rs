//! Session types: the server's record of one live connection.

use tally_protocol::{ConnectionId, RoomId};

/// Where a connected client currently is.
///
/// ```text
///   Lobby ──(join)──→ InRoom ──(leave)──→ Lobby
/// ```
///
/// Disconnecting from either state removes the session entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake done, not in any room.
    Lobby,

    /// Member of `room_id`.
    InRoom { room_id: RoomId },
}

/// One live connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub state: SessionState,
}

impl Session {
    pub(crate) fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            state: SessionState::Lobby,
        }
    }

    /// The room this connection is in, if any.
    pub fn room_id(&self) -> Option<&RoomId> {
        match &self.state {
            SessionState::Lobby => None,
            SessionState::InRoom { room_id } => Some(room_id),
        }
    }
}
