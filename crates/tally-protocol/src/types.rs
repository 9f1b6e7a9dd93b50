//! Core protocol types for Tally's wire format.
//!
//! Everything in this module travels on the wire as JSON. Field names are
//! snake_case; enums are internally tagged with a `"type"` field so the
//! browser client can switch on `msg.type`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tally_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Name of the room used when a client joins without naming one.
pub const DEFAULT_ROOM: &str = "default";

/// Identifier of a voting room.
///
/// Room ids are chosen by clients (a team name, a sprint name, ...), so
/// this wraps a `String` rather than a generated number. Serializes as a
/// plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The implicit room of the single-session setup.
impl Default for RoomId {
    fn default() -> Self {
        Self(DEFAULT_ROOM.to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive a room event. Server-side only, never on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every participant currently in the room.
    All,
    /// A single participant, e.g. the caller of a join.
    Participant(ConnectionId),
}

// ---------------------------------------------------------------------------
// Voting phase
// ---------------------------------------------------------------------------

/// Where a room is in its voting round.
///
/// ```text
///          start_voting            reveal_votes
///   Idle ──────────────→ Voting ──────────────→ Revealed
///    ↑                     ↑  │                    │
///    │                     └──┴── start_voting ────┤
///    └──────────────────── reset_voting ───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VotingPhase {
    /// No task, no votes.
    #[default]
    Idle,
    /// A task is set and votes are being collected, hidden.
    Voting,
    /// Votes are frozen and visible.
    Revealed,
}

impl VotingPhase {
    /// Returns `true` while votes are accepted.
    pub fn is_voting_active(&self) -> bool {
        matches!(self, Self::Voting)
    }

    /// Returns `true` once the current round has been revealed.
    pub fn votes_revealed(&self) -> bool {
        matches!(self, Self::Revealed)
    }
}

impl fmt::Display for VotingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Voting => write!(f, "Voting"),
            Self::Revealed => write!(f, "Revealed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Views sent to clients
// ---------------------------------------------------------------------------

/// One row of the participant list. Never carries the vote value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub name: String,
    pub is_moderator: bool,
    pub has_voted: bool,
}

/// Current task and whether votes are being collected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VotingStatus {
    pub is_voting_active: bool,
    pub current_task: Option<String>,
}

/// A single revealed vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealedVote {
    pub name: String,
    pub value: f64,
}

/// Aggregates over the revealed votes of a round.
///
/// With no votes every numeric field is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VoteStatistics {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Most frequent value; ties resolve to the lowest value.
    pub most_common: f64,
    pub vote_count: usize,
}

/// The outcome of a reveal: individual votes plus statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealResults {
    pub votes: Vec<RevealedVote>,
    pub statistics: VoteStatistics,
}

/// Full room state delivered to a participant when they join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    /// The connection this snapshot was produced for.
    pub connection_id: ConnectionId,
    pub is_moderator: bool,
    pub phase: VotingPhase,
    pub status: VotingStatus,
    pub participants: Vec<ParticipantInfo>,
    /// Present only while the room is in the `Revealed` phase.
    pub results: Option<RevealResults>,
}

/// A summary of a room returned in room listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListEntry {
    pub room_id: RoomId,
    pub participant_count: usize,
    pub phase: VotingPhase,
}

// ---------------------------------------------------------------------------
// SystemMessage — connection and membership plumbing
// ---------------------------------------------------------------------------

/// Messages that manage the connection itself and room membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    // -- Connection lifecycle --
    /// Client → Server: first frame on every connection.
    Handshake { version: u32 },

    /// Server → Client: the handshake was accepted.
    HandshakeAck {
        connection_id: ConnectionId,
        server_time: u64,
    },

    /// Either direction: "I'm disconnecting."
    Disconnect { reason: String },

    // -- Heartbeat --
    /// Client → Server: keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client: keep-alive echo with the server clock.
    HeartbeatAck { client_time: u64, server_time: u64 },

    // -- Room membership --
    /// Client → Server: join a room under a display name. A missing
    /// `room_id` means the default room.
    JoinRoom {
        #[serde(default)]
        room_id: Option<RoomId>,
        name: String,
    },

    /// Client → Server: leave the current room, keeping the connection.
    LeaveRoom,

    /// Client → Server: list the rooms that currently exist.
    ListRooms,

    /// Server → Client: answer to `ListRooms`.
    RoomList { rooms: Vec<RoomListEntry> },

    // -- Errors --
    /// Server → Client: the request could not be served. `code` follows
    /// HTTP conventions (400 bad request, 404 not in a room, 409 conflict).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// RoomAction — client requests against the voting state machine
// ---------------------------------------------------------------------------

/// Voting requests a participant sends to their room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomAction {
    /// Moderator only: open a new round for `task`.
    StartVoting { task: String },
    /// Any participant, while voting is active.
    SubmitVote { value: f64 },
    /// Moderator only: freeze and show the votes.
    RevealVotes,
    /// Moderator only: drop task and votes.
    ResetVoting,
}

// ---------------------------------------------------------------------------
// RoomEvent — notifications pushed to participants
// ---------------------------------------------------------------------------

/// Notifications a room pushes to its participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    UserJoined { name: String },
    UserLeft { name: String },
    UpdateParticipants { participants: Vec<ParticipantInfo> },
    /// Targeted at one participant.
    SetModerator { is_moderator: bool },
    NewTask { task: String },
    UpdateVotingStatus { status: VotingStatus },
    UserVoted { name: String },
    /// Everybody has voted. Advisory only; nothing is revealed.
    AllVotesSubmitted,
    VotesRevealed {
        votes: Vec<RevealedVote>,
        statistics: VoteStatistics,
    },
    ResetVoting,
    /// Targeted at a joiner.
    RoomState { snapshot: RoomSnapshot },
}

// ---------------------------------------------------------------------------
// Payload and Envelope
// ---------------------------------------------------------------------------

/// The content of a frame.
///
/// Adjacently tagged, e.g.
/// `{ "type": "Action", "data": { "type": "RevealVotes" } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Connection and membership plumbing.
    System(SystemMessage),
    /// A voting request from a participant.
    Action(RoomAction),
    /// A room notification.
    Event(RoomEvent),
}

/// The top-level frame. Every message on the wire is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction sequence number.
    pub seq: u64,
    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,
    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! These pin down the JSON shapes the browser client relies on.

    use super::*;

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::new("team-a")).unwrap();
        assert_eq!(json, "\"team-a\"");
    }

    #[test]
    fn test_room_id_default_is_default_room() {
        assert_eq!(RoomId::default().as_str(), DEFAULT_ROOM);
        assert_eq!(RoomId::default().to_string(), "default");
    }

    #[test]
    fn test_voting_phase_flags() {
        assert!(!VotingPhase::Idle.is_voting_active());
        assert!(VotingPhase::Voting.is_voting_active());
        assert!(!VotingPhase::Revealed.is_voting_active());
        assert!(VotingPhase::Revealed.votes_revealed());
        assert!(!VotingPhase::Voting.votes_revealed());
        assert_eq!(VotingPhase::default(), VotingPhase::Idle);
    }

    #[test]
    fn test_handshake_ack_json_format() {
        let msg = SystemMessage::HandshakeAck {
            connection_id: ConnectionId::new(42),
            server_time: 15000,
        };
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "HandshakeAck");
        assert_eq!(json["connection_id"], 42);
        assert_eq!(json["server_time"], 15000);
    }

    #[test]
    fn test_join_room_without_room_id_decodes_to_none() {
        let msg: SystemMessage =
            serde_json::from_str(r#"{"type":"JoinRoom","name":"Alice"}"#)
                .unwrap();
        assert_eq!(
            msg,
            SystemMessage::JoinRoom {
                room_id: None,
                name: "Alice".into(),
            }
        );
    }

    #[test]
    fn test_join_room_with_room_id() {
        let msg: SystemMessage = serde_json::from_str(
            r#"{"type":"JoinRoom","room_id":"R1","name":"Bob"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            SystemMessage::JoinRoom {
                room_id: Some(RoomId::new("R1")),
                name: "Bob".into(),
            }
        );
    }

    #[test]
    fn test_error_json_format() {
        let msg = SystemMessage::Error {
            code: 404,
            message: "not in a room".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 404);
    }

    #[test]
    fn test_submit_vote_accepts_fractional_values() {
        let action: RoomAction =
            serde_json::from_str(r#"{"type":"SubmitVote","value":0.5}"#)
                .unwrap();
        assert_eq!(action, RoomAction::SubmitVote { value: 0.5 });
    }

    #[test]
    fn test_submit_vote_accepts_integer_json() {
        let action: RoomAction =
            serde_json::from_str(r#"{"type":"SubmitVote","value":13}"#)
                .unwrap();
        assert_eq!(action, RoomAction::SubmitVote { value: 13.0 });
    }

    #[test]
    fn test_unit_actions_json_format() {
        let json = serde_json::to_value(RoomAction::RevealVotes).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "RevealVotes" }));
    }

    #[test]
    fn test_update_participants_never_carries_vote_values() {
        let event = RoomEvent::UpdateParticipants {
            participants: vec![ParticipantInfo {
                name: "Alice".into(),
                is_moderator: true,
                has_voted: true,
            }],
        };
        let json = serde_json::to_value(&event).unwrap();
        let row = &json["participants"][0];
        assert_eq!(row["name"], "Alice");
        assert_eq!(row["is_moderator"], true);
        assert_eq!(row["has_voted"], true);
        assert!(row.get("vote").is_none());
    }

    #[test]
    fn test_votes_revealed_json_format() {
        let event = RoomEvent::VotesRevealed {
            votes: vec![RevealedVote {
                name: "Bob".into(),
                value: 3.0,
            }],
            statistics: VoteStatistics {
                average: 3.0,
                min: 3.0,
                max: 3.0,
                most_common: 3.0,
                vote_count: 1,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "VotesRevealed");
        assert_eq!(json["votes"][0]["value"], 3.0);
        assert_eq!(json["statistics"]["most_common"], 3.0);
        assert_eq!(json["statistics"]["vote_count"], 1);
    }

    #[test]
    fn test_voting_status_without_task_is_null() {
        let json = serde_json::to_value(VotingStatus::default()).unwrap();
        assert_eq!(json["is_voting_active"], false);
        assert!(json["current_task"].is_null());
    }

    #[test]
    fn test_payload_action_json_format() {
        let payload = Payload::Action(RoomAction::StartVoting {
            task: "Story 1".into(),
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "Action");
        assert_eq!(json["data"]["type"], "StartVoting");
        assert_eq!(json["data"]["task"], "Story 1");
    }

    #[test]
    fn test_payload_event_unit_variant_json_format() {
        let payload = Payload::Event(RoomEvent::AllVotesSubmitted);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "Event");
        assert_eq!(json["data"]["type"], "AllVotesSubmitted");
    }

    #[test]
    fn test_room_state_event_carries_snapshot() {
        let snapshot = RoomSnapshot {
            room_id: RoomId::new("R1"),
            connection_id: ConnectionId::new(1),
            is_moderator: true,
            phase: VotingPhase::Idle,
            status: VotingStatus::default(),
            participants: vec![],
            results: None,
        };
        let event = RoomEvent::RoomState { snapshot };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RoomState");
        assert_eq!(json["snapshot"]["room_id"], "R1");
        assert_eq!(json["snapshot"]["phase"], "Idle");
        assert!(json["snapshot"]["results"].is_null());
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope {
            seq: 42,
            timestamp: 15000,
            payload: Payload::Event(RoomEvent::UserVoted {
                name: "Bob".into(),
            }),
        };
        let bytes = serde_json::to_vec(&envelope).unwrap();
        let decoded: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_decode_wrong_shape_returns_error() {
        let result: Result<Envelope, _> =
            serde_json::from_str(r#"{"name": "hello"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_action_type_returns_error() {
        let result: Result<RoomAction, _> =
            serde_json::from_str(r#"{"type": "KickEveryone"}"#);
        assert!(result.is_err());
    }
}
