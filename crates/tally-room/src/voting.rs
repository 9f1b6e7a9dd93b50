//! The voting state machine of a single room.
//!
//! [`VotingRoom`] is plain data with synchronous methods. Every operation
//! returns the events it produced as `(Recipient, RoomEvent)` pairs; the
//! room actor owns the room and turns those pairs into channel sends.
//! Nothing here knows about tasks or channels, which keeps the rules
//! testable without a runtime.

use tally_protocol::{
    ConnectionId, ParticipantInfo, Recipient, RevealResults, RevealedVote,
    RoomAction, RoomEvent, RoomId, RoomSnapshot, VotingPhase, VotingStatus,
};

use crate::{stats, RoomError, VotingError};

/// Events produced by one operation, in delivery order.
pub type Outbound = Vec<(Recipient, RoomEvent)>;

/// One member of a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub name: String,
    pub is_moderator: bool,
    /// `None` until the participant votes in the current round.
    pub vote: Option<f64>,
}

impl Participant {
    pub fn has_voted(&self) -> bool {
        self.vote.is_some()
    }

    fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            name: self.name.clone(),
            is_moderator: self.is_moderator,
            has_voted: self.has_voted(),
        }
    }
}

/// Membership, moderator and voting round of one room.
///
/// Participants are kept in join order. That order is what clients
/// display and decides who inherits the moderator role.
#[derive(Debug, Clone)]
pub struct VotingRoom {
    room_id: RoomId,
    participants: Vec<Participant>,
    phase: VotingPhase,
    current_task: Option<String>,
}

impl VotingRoom {
    /// Creates an empty room: no participants, no task, phase `Idle`.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            participants: Vec::new(),
            phase: VotingPhase::Idle,
            current_task: None,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn phase(&self) -> VotingPhase {
        self.phase
    }

    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.position(connection_id).is_some()
    }

    /// The current moderator, if the room has participants.
    pub fn moderator(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_moderator)
    }

    /// The membership list as clients see it.
    pub fn participant_list(&self) -> Vec<ParticipantInfo> {
        self.participants.iter().map(Participant::info).collect()
    }

    pub fn status(&self) -> VotingStatus {
        VotingStatus {
            is_voting_active: self.phase.is_voting_active(),
            current_task: self.current_task.clone(),
        }
    }

    /// The revealed votes and their statistics, once the round is
    /// revealed.
    pub fn results(&self) -> Option<RevealResults> {
        self.phase.votes_revealed().then(|| self.collect_results())
    }

    /// Full room state as seen by `connection_id`.
    pub fn snapshot(&self, connection_id: ConnectionId) -> RoomSnapshot {
        let is_moderator = self
            .position(connection_id)
            .is_some_and(|i| self.participants[i].is_moderator);
        RoomSnapshot {
            room_id: self.room_id.clone(),
            connection_id,
            is_moderator,
            phase: self.phase,
            status: self.status(),
            participants: self.participant_list(),
            results: self.results(),
        }
    }

    // -- Membership -------------------------------------------------------

    /// Adds a participant. The first participant of an empty room becomes
    /// moderator.
    ///
    /// The joiner receives the room snapshot and their moderator flag;
    /// everyone learns about the new member. Joining mid-vote also hands
    /// the joiner the task and voting status, leaving other votes intact.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        name: String,
    ) -> Result<Outbound, RoomError> {
        if self.contains(connection_id) {
            return Err(RoomError::AlreadyInRoom(
                connection_id,
                self.room_id.clone(),
            ));
        }

        let is_moderator = self.participants.is_empty();
        self.participants.push(Participant {
            connection_id,
            name: name.clone(),
            is_moderator,
            vote: None,
        });

        let me = Recipient::Participant(connection_id);
        let mut out = vec![
            (
                me,
                RoomEvent::RoomState {
                    snapshot: self.snapshot(connection_id),
                },
            ),
            (Recipient::All, RoomEvent::UserJoined { name }),
            (me, RoomEvent::SetModerator { is_moderator }),
            (Recipient::All, self.participants_event()),
        ];

        if self.phase.is_voting_active() {
            if let Some(task) = &self.current_task {
                out.push((me, RoomEvent::NewTask { task: task.clone() }));
            }
            out.push((me, RoomEvent::UpdateVotingStatus { status: self.status() }));
        }

        Ok(out)
    }

    /// Removes a participant, promoting the earliest-joined remaining
    /// participant if the moderator left.
    pub fn leave(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Outbound, RoomError> {
        let index = self.position(connection_id).ok_or_else(|| {
            RoomError::NotInRoom(connection_id, self.room_id.clone())
        })?;
        let gone = self.participants.remove(index);

        let promoted = match self.participants.first_mut() {
            Some(next) if gone.is_moderator => {
                next.is_moderator = true;
                Some(next.connection_id)
            }
            _ => None,
        };

        let mut out = vec![
            (Recipient::All, RoomEvent::UserLeft { name: gone.name }),
            (Recipient::All, self.participants_event()),
        ];
        if let Some(conn) = promoted {
            tracing::info!(
                room_id = %self.room_id,
                connection_id = %conn,
                "moderator handed off"
            );
            out.push((
                Recipient::Participant(conn),
                RoomEvent::SetModerator { is_moderator: true },
            ));
        }
        Ok(out)
    }

    // -- Voting -----------------------------------------------------------

    /// Dispatches a client action to the matching operation.
    pub fn apply(
        &mut self,
        caller: ConnectionId,
        action: RoomAction,
    ) -> Result<Outbound, VotingError> {
        match action {
            RoomAction::StartVoting { task } => self.start_voting(caller, task),
            RoomAction::SubmitVote { value } => self.submit_vote(caller, value),
            RoomAction::RevealVotes => self.reveal_votes(caller),
            RoomAction::ResetVoting => self.reset_voting(caller),
        }
    }

    /// Opens a new round for `task`, from any phase. Moderator only.
    pub fn start_voting(
        &mut self,
        caller: ConnectionId,
        task: String,
    ) -> Result<Outbound, VotingError> {
        self.require_moderator(caller)?;

        self.clear_votes();
        self.current_task = Some(task.clone());
        self.phase = VotingPhase::Voting;

        Ok(vec![
            (Recipient::All, RoomEvent::NewTask { task }),
            (Recipient::All, RoomEvent::UpdateVotingStatus { status: self.status() }),
            (Recipient::All, self.participants_event()),
        ])
    }

    /// Records or overwrites the caller's vote while voting is open.
    pub fn submit_vote(
        &mut self,
        caller: ConnectionId,
        value: f64,
    ) -> Result<Outbound, VotingError> {
        let index = self.position(caller).ok_or(VotingError::NotMember)?;
        if !self.phase.is_voting_active() {
            return Err(VotingError::WrongPhase);
        }

        let all_before = self.all_voted();
        let participant = &mut self.participants[index];
        participant.vote = Some(value);
        let name = participant.name.clone();

        let mut out = vec![
            (Recipient::All, RoomEvent::UserVoted { name }),
            (Recipient::All, self.participants_event()),
        ];
        if !all_before && self.all_voted() {
            out.push((Recipient::All, RoomEvent::AllVotesSubmitted));
        }
        Ok(out)
    }

    /// Freezes the round and publishes votes with statistics. Moderator
    /// only, and only while voting.
    pub fn reveal_votes(
        &mut self,
        caller: ConnectionId,
    ) -> Result<Outbound, VotingError> {
        self.require_moderator(caller)?;
        if !self.phase.is_voting_active() {
            return Err(VotingError::WrongPhase);
        }

        self.phase = VotingPhase::Revealed;
        let RevealResults { votes, statistics } = self.collect_results();

        Ok(vec![
            (Recipient::All, RoomEvent::VotesRevealed { votes, statistics }),
            (Recipient::All, RoomEvent::UpdateVotingStatus { status: self.status() }),
        ])
    }

    /// Drops task and votes and returns to `Idle`, from any phase.
    /// Moderator only.
    pub fn reset_voting(
        &mut self,
        caller: ConnectionId,
    ) -> Result<Outbound, VotingError> {
        self.require_moderator(caller)?;

        self.clear_votes();
        self.current_task = None;
        self.phase = VotingPhase::Idle;

        Ok(vec![
            (Recipient::All, RoomEvent::ResetVoting),
            (Recipient::All, self.participants_event()),
        ])
    }

    // -- Internals --------------------------------------------------------

    fn position(&self, connection_id: ConnectionId) -> Option<usize> {
        self.participants
            .iter()
            .position(|p| p.connection_id == connection_id)
    }

    fn require_moderator(&self, caller: ConnectionId) -> Result<(), VotingError> {
        let index = self.position(caller).ok_or(VotingError::NotMember)?;
        if self.participants[index].is_moderator {
            Ok(())
        } else {
            Err(VotingError::PermissionDenied)
        }
    }

    fn all_voted(&self) -> bool {
        !self.participants.is_empty()
            && self.participants.iter().all(Participant::has_voted)
    }

    fn clear_votes(&mut self) {
        for p in &mut self.participants {
            p.vote = None;
        }
    }

    fn collect_results(&self) -> RevealResults {
        let votes: Vec<RevealedVote> = self
            .participants
            .iter()
            .filter_map(|p| {
                p.vote.map(|value| RevealedVote {
                    name: p.name.clone(),
                    value,
                })
            })
            .collect();
        let values: Vec<f64> = votes.iter().map(|v| v.value).collect();
        RevealResults {
            statistics: stats::compute(&values),
            votes,
        }
    }

    fn participants_event(&self) -> RoomEvent {
        RoomEvent::UpdateParticipants {
            participants: self.participant_list(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn room() -> VotingRoom {
        VotingRoom::new(RoomId::new("R1"))
    }

    /// Alice (moderator, conn 1) and Bob (conn 2).
    fn alice_and_bob() -> VotingRoom {
        let mut room = room();
        room.join(cid(1), "Alice".into()).unwrap();
        room.join(cid(2), "Bob".into()).unwrap();
        room
    }

    fn events_for(out: &Outbound, who: Recipient) -> Vec<&RoomEvent> {
        out.iter()
            .filter(|(r, _)| *r == who)
            .map(|(_, e)| e)
            .collect()
    }

    fn has_voted(room: &VotingRoom, conn: u64) -> bool {
        room.participants()
            .iter()
            .find(|p| p.connection_id == cid(conn))
            .is_some_and(Participant::has_voted)
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_first_participant_is_moderator() {
        let mut room = room();

        let out = room.join(cid(1), "Alice".into()).unwrap();

        assert_eq!(room.moderator().unwrap().name, "Alice");
        assert!(events_for(&out, Recipient::Participant(cid(1)))
            .contains(&&RoomEvent::SetModerator { is_moderator: true }));
    }

    #[test]
    fn test_join_second_participant_is_not_moderator() {
        let mut room = room();
        room.join(cid(1), "Alice".into()).unwrap();

        let out = room.join(cid(2), "Bob".into()).unwrap();

        assert_eq!(room.moderator().unwrap().connection_id, cid(1));
        assert!(events_for(&out, Recipient::Participant(cid(2)))
            .contains(&&RoomEvent::SetModerator { is_moderator: false }));
        assert_eq!(room.participants().iter().filter(|p| p.is_moderator).count(), 1);
    }

    #[test]
    fn test_join_event_order_snapshot_first() {
        let mut room = room();

        let out = room.join(cid(1), "Alice".into()).unwrap();

        assert!(matches!(out[0].1, RoomEvent::RoomState { .. }));
        assert_eq!(out[1], (Recipient::All, RoomEvent::UserJoined { name: "Alice".into() }));
        assert!(matches!(out[3].1, RoomEvent::UpdateParticipants { .. }));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_join_twice_returns_already_in_room() {
        let mut room = room();
        room.join(cid(1), "Alice".into()).unwrap();

        let result = room.join(cid(1), "Alice again".into());

        assert!(matches!(result, Err(RoomError::AlreadyInRoom(c, _)) if c == cid(1)));
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn test_join_mid_vote_sends_task_to_joiner_and_keeps_votes() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 2".into()).unwrap();
        room.submit_vote(cid(2), 8.0).unwrap();

        let out = room.join(cid(3), "Carol".into()).unwrap();

        let carol = events_for(&out, Recipient::Participant(cid(3)));
        assert!(carol.contains(&&RoomEvent::NewTask { task: "Story 2".into() }));
        assert!(carol.iter().any(|e| matches!(
            e,
            RoomEvent::UpdateVotingStatus { status }
                if status.is_voting_active
                    && status.current_task.as_deref() == Some("Story 2")
        )));
        // Nobody else hears about the task again.
        assert!(!events_for(&out, Recipient::All)
            .iter()
            .any(|e| matches!(e, RoomEvent::NewTask { .. })));
        assert!(has_voted(&room, 2));
        assert!(!has_voted(&room, 3));
        assert_eq!(room.phase(), VotingPhase::Voting);
    }

    #[test]
    fn test_join_while_idle_sends_no_task() {
        let mut room = room();
        let out = room.join(cid(1), "Alice".into()).unwrap();
        assert!(!out.iter().any(|(_, e)| matches!(e, RoomEvent::NewTask { .. })));
    }

    // =====================================================================
    // leave()
    // =====================================================================

    #[test]
    fn test_leave_moderator_promotes_earliest_joined() {
        let mut room = alice_and_bob();
        room.join(cid(3), "Carol".into()).unwrap();

        let out = room.leave(cid(1)).unwrap();

        assert_eq!(room.moderator().unwrap().name, "Bob");
        assert_eq!(room.participants().iter().filter(|p| p.is_moderator).count(), 1);
        assert_eq!(
            out.last(),
            Some(&(
                Recipient::Participant(cid(2)),
                RoomEvent::SetModerator { is_moderator: true }
            ))
        );
        // The broadcast list already shows Bob as moderator.
        let RoomEvent::UpdateParticipants { participants } = &out[1].1 else {
            panic!("expected UpdateParticipants, got {:?}", out[1].1);
        };
        assert!(participants[0].is_moderator);
        assert_eq!(participants[0].name, "Bob");
    }

    #[test]
    fn test_leave_non_moderator_keeps_moderator() {
        let mut room = alice_and_bob();

        let out = room.leave(cid(2)).unwrap();

        assert_eq!(room.moderator().unwrap().name, "Alice");
        assert_eq!(out[0], (Recipient::All, RoomEvent::UserLeft { name: "Bob".into() }));
        assert!(!out.iter().any(|(_, e)| matches!(e, RoomEvent::SetModerator { .. })));
    }

    #[test]
    fn test_leave_last_participant_leaves_no_moderator() {
        let mut room = room();
        room.join(cid(1), "Alice".into()).unwrap();

        room.leave(cid(1)).unwrap();

        assert!(room.is_empty());
        assert!(room.moderator().is_none());

        // Next joiner is promoted.
        room.join(cid(2), "Bob".into()).unwrap();
        assert_eq!(room.moderator().unwrap().name, "Bob");
    }

    #[test]
    fn test_leave_unknown_returns_not_in_room() {
        let mut room = alice_and_bob();
        assert!(matches!(room.leave(cid(9)), Err(RoomError::NotInRoom(c, _)) if c == cid(9)));
    }

    // =====================================================================
    // start_voting()
    // =====================================================================

    #[test]
    fn test_start_voting_by_moderator_opens_round() {
        let mut room = alice_and_bob();

        let out = room.start_voting(cid(1), "Story 1".into()).unwrap();

        assert_eq!(room.phase(), VotingPhase::Voting);
        assert_eq!(room.current_task(), Some("Story 1"));
        assert_eq!(out[0], (Recipient::All, RoomEvent::NewTask { task: "Story 1".into() }));
        assert!(matches!(out[1].1, RoomEvent::UpdateVotingStatus { .. }));
        assert!(matches!(out[2].1, RoomEvent::UpdateParticipants { .. }));
    }

    #[test]
    fn test_start_voting_by_non_moderator_is_denied() {
        let mut room = alice_and_bob();

        let result = room.start_voting(cid(2), "Story 1".into());

        assert_eq!(result, Err(VotingError::PermissionDenied));
        assert_eq!(room.phase(), VotingPhase::Idle);
        assert_eq!(room.current_task(), None);
    }

    #[test]
    fn test_start_voting_by_stranger_is_not_member() {
        let mut room = alice_and_bob();
        assert_eq!(
            room.start_voting(cid(9), "x".into()),
            Err(VotingError::NotMember)
        );
    }

    #[test]
    fn test_start_voting_after_reveal_clears_votes() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();
        room.submit_vote(cid(2), 3.0).unwrap();
        room.reveal_votes(cid(1)).unwrap();

        room.start_voting(cid(1), "Story 2".into()).unwrap();

        assert_eq!(room.phase(), VotingPhase::Voting);
        assert!(!has_voted(&room, 2));
        assert!(room.results().is_none());
    }

    // =====================================================================
    // submit_vote()
    // =====================================================================

    #[test]
    fn test_submit_vote_while_idle_is_wrong_phase() {
        let mut room = alice_and_bob();

        let result = room.submit_vote(cid(2), 5.0);

        assert_eq!(result, Err(VotingError::WrongPhase));
        assert!(!has_voted(&room, 2));
    }

    #[test]
    fn test_submit_vote_after_reveal_is_wrong_phase() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();
        room.reveal_votes(cid(1)).unwrap();

        assert_eq!(room.submit_vote(cid(2), 5.0), Err(VotingError::WrongPhase));
        assert!(!has_voted(&room, 2));
    }

    #[test]
    fn test_submit_vote_broadcasts_identity_not_value() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();

        let out = room.submit_vote(cid(2), 3.0).unwrap();

        assert_eq!(out[0], (Recipient::All, RoomEvent::UserVoted { name: "Bob".into() }));
        let RoomEvent::UpdateParticipants { participants } = &out[1].1 else {
            panic!("expected UpdateParticipants");
        };
        assert!(participants[1].has_voted);
        assert!(!participants[0].has_voted);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_submit_vote_all_votes_submitted_fires_once() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();

        let first = room.submit_vote(cid(2), 3.0).unwrap();
        let second = room.submit_vote(cid(1), 5.0).unwrap();
        let revote = room.submit_vote(cid(2), 8.0).unwrap();

        let fired = |out: &Outbound| {
            out.iter().filter(|(_, e)| *e == RoomEvent::AllVotesSubmitted).count()
        };
        assert_eq!(fired(&first), 0);
        assert_eq!(fired(&second), 1);
        assert_eq!(fired(&revote), 0);
        // Advisory only.
        assert_eq!(room.phase(), VotingPhase::Voting);
    }

    #[test]
    fn test_submit_vote_late_joiner_rearms_all_votes_submitted() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();
        room.submit_vote(cid(1), 1.0).unwrap();
        room.submit_vote(cid(2), 1.0).unwrap();
        room.join(cid(3), "Carol".into()).unwrap();

        let out = room.submit_vote(cid(3), 2.0).unwrap();

        assert!(out.iter().any(|(_, e)| *e == RoomEvent::AllVotesSubmitted));
    }

    #[test]
    fn test_submit_vote_overwrites_previous() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();
        room.submit_vote(cid(2), 3.0).unwrap();
        room.submit_vote(cid(2), 13.0).unwrap();
        room.reveal_votes(cid(1)).unwrap();

        let results = room.results().unwrap();
        assert_eq!(results.votes, vec![RevealedVote { name: "Bob".into(), value: 13.0 }]);
    }

    // =====================================================================
    // reveal_votes()
    // =====================================================================

    #[test]
    fn test_reveal_votes_computes_statistics() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();
        room.submit_vote(cid(2), 3.0).unwrap();
        room.submit_vote(cid(1), 5.0).unwrap();

        let out = room.reveal_votes(cid(1)).unwrap();

        assert_eq!(room.phase(), VotingPhase::Revealed);
        let RoomEvent::VotesRevealed { votes, statistics } = &out[0].1 else {
            panic!("expected VotesRevealed");
        };
        // Join order, not vote order.
        assert_eq!(votes[0].name, "Alice");
        assert_eq!(votes[1].name, "Bob");
        assert_eq!(statistics.average, 4.0);
        assert_eq!(statistics.min, 3.0);
        assert_eq!(statistics.max, 5.0);
        assert_eq!(statistics.most_common, 3.0);
        assert_eq!(statistics.vote_count, 2);
        assert!(matches!(
            &out[1].1,
            RoomEvent::UpdateVotingStatus { status } if !status.is_voting_active
        ));
    }

    #[test]
    fn test_reveal_votes_without_votes_is_all_zero() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();

        room.reveal_votes(cid(1)).unwrap();

        let results = room.results().unwrap();
        assert!(results.votes.is_empty());
        assert_eq!(results.statistics.vote_count, 0);
        assert_eq!(results.statistics.average, 0.0);
        assert_eq!(results.statistics.min, 0.0);
        assert_eq!(results.statistics.max, 0.0);
    }

    #[test]
    fn test_reveal_votes_when_idle_is_wrong_phase() {
        let mut room = alice_and_bob();
        assert_eq!(room.reveal_votes(cid(1)), Err(VotingError::WrongPhase));
        assert_eq!(room.phase(), VotingPhase::Idle);
    }

    #[test]
    fn test_reveal_votes_twice_is_wrong_phase() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();
        room.reveal_votes(cid(1)).unwrap();
        assert_eq!(room.reveal_votes(cid(1)), Err(VotingError::WrongPhase));
    }

    #[test]
    fn test_reveal_votes_by_non_moderator_is_denied() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();

        assert_eq!(room.reveal_votes(cid(2)), Err(VotingError::PermissionDenied));
        assert_eq!(room.phase(), VotingPhase::Voting);
    }

    // =====================================================================
    // reset_voting()
    // =====================================================================

    #[test]
    fn test_reset_voting_clears_from_any_phase() {
        for reveal in [false, true] {
            let mut room = alice_and_bob();
            room.start_voting(cid(1), "Story 1".into()).unwrap();
            room.submit_vote(cid(2), 3.0).unwrap();
            if reveal {
                room.reveal_votes(cid(1)).unwrap();
            }

            let out = room.reset_voting(cid(1)).unwrap();

            assert_eq!(room.phase(), VotingPhase::Idle);
            assert_eq!(room.current_task(), None);
            assert!(room.participants().iter().all(|p| p.vote.is_none()));
            assert_eq!(out[0], (Recipient::All, RoomEvent::ResetVoting));
        }
    }

    #[test]
    fn test_reset_voting_when_idle_succeeds() {
        let mut room = alice_and_bob();
        assert!(room.reset_voting(cid(1)).is_ok());
    }

    #[test]
    fn test_reset_voting_by_non_moderator_is_denied() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();
        room.submit_vote(cid(2), 3.0).unwrap();

        assert_eq!(room.reset_voting(cid(2)), Err(VotingError::PermissionDenied));
        assert!(has_voted(&room, 2));
    }

    // =====================================================================
    // snapshot()
    // =====================================================================

    #[test]
    fn test_snapshot_after_reveal_includes_results() {
        let mut room = alice_and_bob();
        room.start_voting(cid(1), "Story 1".into()).unwrap();
        room.submit_vote(cid(2), 3.0).unwrap();
        room.reveal_votes(cid(1)).unwrap();

        let snap = room.snapshot(cid(2));

        assert_eq!(snap.connection_id, cid(2));
        assert!(!snap.is_moderator);
        assert_eq!(snap.phase, VotingPhase::Revealed);
        assert_eq!(snap.results.unwrap().statistics.vote_count, 1);
    }

    #[test]
    fn test_apply_routes_actions() {
        let mut room = alice_and_bob();

        room.apply(cid(1), RoomAction::StartVoting { task: "T".into() }).unwrap();
        room.apply(cid(2), RoomAction::SubmitVote { value: 2.0 }).unwrap();
        room.apply(cid(1), RoomAction::RevealVotes).unwrap();
        assert_eq!(room.phase(), VotingPhase::Revealed);

        room.apply(cid(1), RoomAction::ResetVoting).unwrap();
        assert_eq!(room.phase(), VotingPhase::Idle);
    }
}
