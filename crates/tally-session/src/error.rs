//! Error types for the session layer.

use tally_protocol::{ConnectionId, RoomId};

/// Errors that can occur while tracking connections.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the connection: it never completed the
    /// handshake, or it has already disconnected.
    #[error("session not found for {0}")]
    NotFound(ConnectionId),

    /// The connection is already registered.
    #[error("{0} already has an active session")]
    AlreadyConnected(ConnectionId),

    /// The connection is already a member of a room. A connection can be
    /// in at most one room at a time.
    #[error("{0} is already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomId),
}
