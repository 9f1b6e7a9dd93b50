//! Room configuration.

use serde::{Deserialize, Serialize};

/// Default command channel size for room actors.
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Shut down and forget a room once its last participant leaves.
    /// With this off, empty rooms keep their task and phase until the
    /// next joiner arrives.
    pub reap_empty_rooms: bool,

    /// Capacity of each room actor's command channel. Senders wait when
    /// it is full. Zero is raised to one.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            reap_empty_rooms: true,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}
