//! Error types for the room layer.

use tally_protocol::{ConnectionId, RoomId};

/// Errors from room membership and the room actor plumbing.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The connection is already a participant of this room.
    #[error("connection {0} already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomId),

    /// The connection is not a participant of this room.
    #[error("connection {0} not in room {1}")]
    NotInRoom(ConnectionId, RoomId),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

/// Why a voting operation was refused.
///
/// The room actor never reports these to clients; they only show up in
/// debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VotingError {
    /// The caller is not a participant of the room.
    #[error("caller is not a participant")]
    NotMember,

    /// The operation is reserved for the moderator.
    #[error("only the moderator may do this")]
    PermissionDenied,

    /// The room is not in a phase that allows the operation.
    #[error("not allowed in the current voting phase")]
    WrongPhase,
}
