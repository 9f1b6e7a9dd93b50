//! Connection registry for Tally.
//!
//! Tracks every connection that completed the handshake and which room,
//! if any, it is currently in:
//!
//! 1. **Connect** — a session is registered after the handshake
//! 2. **Membership** — joining binds the session to one room at a time
//! 3. **Disconnect** — the session is removed exactly once and handed
//!    back so the caller can take the participant out of its room
//!
//! ```text
//! Room Layer        ← told which room a departing connection was in
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer    ← ConnectionId, RoomId
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{Session, SessionState};
