//! The session registry: every live connection and its room membership.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain `HashMap` wrapper. The server keeps it
//! behind a mutex in its shared state; nothing in here awaits.

use std::collections::HashMap;

use tally_protocol::{ConnectionId, RoomId};

use crate::{Session, SessionError, SessionState};

/// Registry of live connections, keyed by [`ConnectionId`].
///
/// ```text
/// connect() ──→ bind_room() ──→ unbind_room() ──→ disconnect()
///    │               │                                 ↑
///    ▼               ▼                                 │
/// [Lobby]        [InRoom] ─────────────────────────────┘
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection that completed the handshake.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the id is already registered.
    pub fn connect(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&connection_id) {
            return Err(SessionError::AlreadyConnected(connection_id));
        }
        let session = self
            .sessions
            .entry(connection_id)
            .or_insert_with(|| Session::new(connection_id));
        tracing::info!(%connection_id, "session created");
        Ok(session)
    }

    /// Records that the connection joined `room_id`.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] — unknown connection
    /// - [`SessionError::AlreadyInRoom`] — already a member of a room
    pub fn bind_room(
        &mut self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;

        if let SessionState::InRoom { room_id: current } = &session.state {
            return Err(SessionError::AlreadyInRoom(
                connection_id,
                current.clone(),
            ));
        }

        tracing::debug!(%connection_id, %room_id, "session bound to room");
        session.state = SessionState::InRoom { room_id };
        Ok(())
    }

    /// Returns the connection to the lobby, handing back the room it left.
    ///
    /// `None` if the connection is unknown or was not in a room.
    pub fn unbind_room(&mut self, connection_id: ConnectionId) -> Option<RoomId> {
        let session = self.sessions.get_mut(&connection_id)?;
        match std::mem::replace(&mut session.state, SessionState::Lobby) {
            SessionState::InRoom { room_id } => {
                tracing::debug!(%connection_id, %room_id, "session left room");
                Some(room_id)
            }
            SessionState::Lobby => None,
        }
    }

    /// The room a connection is currently in.
    pub fn room_of(&self, connection_id: ConnectionId) -> Option<RoomId> {
        self.sessions
            .get(&connection_id)
            .and_then(|s| s.room_id().cloned())
    }

    /// Removes the connection's session and returns it.
    ///
    /// Only the first call for a given id returns `Some`; later calls are
    /// silent no-ops, so transport-level disconnect notifications can be
    /// forwarded without deduplication.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&connection_id)?;
        tracing::info!(
            %connection_id,
            room_id = session.room_id().map(RoomId::as_str),
            "session removed"
        );
        Some(session)
    }

    /// Looks up a session.
    pub fn get(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
