//! Rooms for Tally.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! room's [`VotingRoom`]: its participants, moderator and voting round.
//!
//! # Key types
//!
//! - [`VotingRoom`] — the voting state machine, plain synchronous data
//! - [`RoomManager`] — creates rooms on first join, reaps empty ones
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomConfig`] — settings shared by all rooms

mod config;
mod error;
mod manager;
mod room;
pub mod stats;
mod voting;

pub use config::{RoomConfig, DEFAULT_COMMAND_BUFFER};
pub use error::{RoomError, VotingError};
pub use manager::RoomManager;
pub use room::{ParticipantSender, RoomHandle, RoomInfo};
pub use voting::{Outbound, Participant, VotingRoom};
