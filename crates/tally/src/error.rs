//! Unified error type for Tally.

use tally_protocol::ProtocolError;
use tally_room::{RoomError, VotingError};
use tally_session::SessionError;
use tally_transport::TransportError;

/// Top-level error wrapping every layer's error type.
///
/// The `#[from]` conversions let `?` lift sub-crate errors without
/// ceremony.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encode, decode or protocol rule failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection registry failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Room lookup or membership failure.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A refused voting operation.
    #[error(transparent)]
    Voting(#[from] VotingError),
}
