//! # Tally
//!
//! A real-time planning poker server.
//!
//! Clients connect over WebSocket, join a named room, and estimate tasks
//! together: the room's moderator opens a vote, participants submit
//! hidden numeric votes, and the moderator reveals them along with the
//! average, range, and most common value. Everything lives in memory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tally::prelude::*;
//!
//! # async fn run() -> Result<(), TallyError> {
//! let server = TallyServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::TallyError;
pub use server::{ServerConfig, TallyServer, TallyServerBuilder, PROTOCOL_VERSION};

pub mod prelude {
    //! Everything a server binary or a test client usually needs.

    pub use crate::{ServerConfig, TallyError, TallyServer, TallyServerBuilder, PROTOCOL_VERSION};
    pub use tally_protocol::{
        Codec, ConnectionId, Envelope, JsonCodec, ParticipantInfo, Payload,
        RevealedVote, RoomAction, RoomEvent, RoomId, RoomListEntry, RoomSnapshot,
        SystemMessage, VoteStatistics, VotingPhase, VotingStatus,
    };
    pub use tally_room::RoomConfig;
}
