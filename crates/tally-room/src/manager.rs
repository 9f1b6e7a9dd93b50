//! Room manager: creates, tracks, and reaps rooms.

use std::collections::HashMap;

use tally_protocol::{ConnectionId, RoomAction, RoomId, RoomListEntry, RoomSnapshot};

use crate::room::spawn_room;
use crate::{ParticipantSender, RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Owns a handle to every live room, keyed by room id.
///
/// Rooms are created lazily by the first join and, with
/// [`RoomConfig::reap_empty_rooms`], dropped when the last participant
/// leaves. Which room a connection is in is tracked by the session
/// layer, not here.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<RoomId, RoomHandle>,
    config: RoomConfig,
}

impl RoomManager {
    /// Creates a manager with the default [`RoomConfig`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Returns the room's handle, spawning an empty room if none exists.
    pub fn get_or_create_room(&mut self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.get(room_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
            tracing::warn!(%room_id, "room actor gone, respawning");
        }

        let handle = spawn_room(room_id.clone(), self.config.command_buffer);
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, "room created");
        handle
    }

    /// Adds a participant to a room, creating the room if needed, and
    /// returns the room as the joiner sees it.
    pub async fn join_room(
        &mut self,
        room_id: &RoomId,
        connection_id: ConnectionId,
        name: String,
        sender: ParticipantSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let handle = self.get_or_create_room(room_id);
        handle.join(connection_id, name, sender).await
    }

    /// Removes a participant from a room and reaps the room if that left
    /// it empty. Returns the number of participants remaining.
    pub async fn leave_room(
        &mut self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<usize, RoomError> {
        let handle = self.existing(room_id)?;
        let remaining = handle.leave(connection_id).await?;

        if remaining == 0 && self.config.reap_empty_rooms {
            self.rooms.remove(room_id);
            let _ = handle.shutdown().await;
            tracing::info!(%room_id, "empty room reaped");
        }
        Ok(remaining)
    }

    /// Forwards a voting action to a room without waiting for it to be
    /// processed.
    pub async fn route_action(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        self.existing(room_id)?.send_action(connection_id, action).await
    }

    /// A clone of the room's handle, for use after releasing the manager.
    pub fn handle(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).cloned()
    }

    pub async fn get_room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        self.existing(room_id)?.get_info().await
    }

    /// The room as `connection_id` would see it.
    pub async fn snapshot(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<RoomSnapshot, RoomError> {
        self.existing(room_id)?.snapshot(connection_id).await
    }

    /// Info about every room, ordered by room id. Rooms that fail to
    /// answer are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(info) = handle.get_info().await {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        infos
    }

    /// Shuts a room down and forgets it.
    pub async fn destroy_room(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    fn existing(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.handle(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }
}

impl From<RoomInfo> for RoomListEntry {
    fn from(info: RoomInfo) -> Self {
        Self {
            room_id: info.room_id,
            participant_count: info.participant_count,
            phase: info.phase,
        }
    }
}
