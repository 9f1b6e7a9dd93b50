//! Wire protocol for Tally.
//!
//! - **Types** ([`Envelope`], [`Payload`], [`SystemMessage`],
//!   [`RoomAction`], [`RoomEvent`] and the views they carry) — what
//!   travels between browser and server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session / Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use tally_transport::ConnectionId;
pub use types::{
    Envelope, ParticipantInfo, Payload, Recipient, RevealResults, RevealedVote,
    RoomAction, RoomEvent, RoomId, RoomListEntry, RoomSnapshot, SystemMessage,
    VoteStatistics, VotingPhase, VotingStatus, DEFAULT_ROOM,
};
