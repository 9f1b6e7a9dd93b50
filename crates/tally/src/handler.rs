//! Per-connection handler: handshake, message routing, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version
//!   2. Register the connection, send HandshakeAck
//!   3. Spawn a forwarder that pushes room events to the socket
//!   4. Loop: receive envelopes → system messages or voting actions
//!   5. On exit, the guard removes the session and leaves the room

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tally_protocol::{
    Codec, ConnectionId, Envelope, Payload, ProtocolError, RoomAction,
    RoomEvent, RoomId, RoomListEntry, SystemMessage,
};
use tally_room::RoomError;
use tally_transport::{Connection, WebSocketConnection};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::server::{ServerState, PROTOCOL_VERSION};
use crate::TallyError;

/// Error codes carried by `SystemMessage::Error`.
const BAD_REQUEST: u16 = 400;
const NOT_IN_ROOM: u16 = 404;
const CONFLICT: u16 = 409;

/// Writes envelopes to one connection.
///
/// Shared between the read loop and the event forwarder. The sequence
/// counter stays locked until the frame is written, so `seq` order is
/// wire order.
struct Outbox<C: Codec> {
    conn: Arc<WebSocketConnection>,
    codec: C,
    seq: Mutex<u64>,
    start: Instant,
}

impl<C: Codec> Outbox<C> {
    fn new(conn: Arc<WebSocketConnection>, codec: C, start: Instant) -> Self {
        Self {
            conn,
            codec,
            seq: Mutex::new(0),
            start,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    async fn send(&self, payload: Payload) -> Result<(), TallyError> {
        let mut seq = self.seq.lock().await;
        let envelope = Envelope {
            seq: *seq,
            timestamp: self.elapsed_ms(),
            payload,
        };
        let bytes = self.codec.encode(&envelope)?;
        *seq += 1;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_system(&self, msg: SystemMessage) -> Result<(), TallyError> {
        self.send(Payload::System(msg)).await
    }

    async fn send_error(&self, code: u16, message: impl Into<String>) -> Result<(), TallyError> {
        self.send_system(SystemMessage::Error {
            code,
            message: message.into(),
        })
        .await
    }
}

/// Drop guard that disconnects the connection when the handler exits.
///
/// Runs even if the handler panics. `Drop` is synchronous, so the async
/// cleanup is spawned.
struct ConnectionGuard<C: Codec> {
    connection_id: ConnectionId,
    state: Arc<ServerState<C>>,
    forwarder: JoinHandle<()>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.forwarder.abort();

        let connection_id = self.connection_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let session = state.sessions.lock().await.disconnect(connection_id);
            let Some(room_id) = session.and_then(|s| s.room_id().cloned()) else {
                return;
            };
            let result = state
                .rooms
                .lock()
                .await
                .leave_room(&room_id, connection_id)
                .await;
            if let Err(e) = result {
                tracing::debug!(%connection_id, %room_id, error = %e, "leave on disconnect failed");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TallyError>
where
    C: Codec + Clone,
{
    let connection_id = conn.id();
    let conn = Arc::new(conn);
    let outbox = Arc::new(Outbox::new(
        Arc::clone(&conn),
        state.codec.clone(),
        Instant::now(),
    ));
    tracing::debug!(%connection_id, "handling new connection");

    // --- Step 1: Handshake ---
    perform_handshake(&conn, &state, &outbox).await?;

    // Register and arm the guard together, so a registered connection is
    // always cleaned up.
    state.sessions.lock().await.connect(connection_id)?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _guard = ConnectionGuard {
        connection_id,
        state: Arc::clone(&state),
        forwarder: tokio::spawn(forward_events(Arc::clone(&outbox), events_rx)),
    };

    outbox
        .send_system(SystemMessage::HandshakeAck {
            connection_id,
            server_time: outbox.elapsed_ms(),
        })
        .await?;
    tracing::info!(%connection_id, "client connected");

    // --- Step 2: Message loop ---
    loop {
        let data = match tokio::time::timeout(state.config.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%connection_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%connection_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%connection_id, "connection idle, closing");
                let _ = conn.close().await;
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                if is_action_frame(&state.codec, &data) {
                    outbox
                        .send_error(BAD_REQUEST, format!("invalid action: {e}"))
                        .await?;
                } else {
                    tracing::debug!(%connection_id, error = %e, "failed to decode envelope");
                }
                continue;
            }
        };

        match envelope.payload {
            Payload::System(msg) => {
                let should_close =
                    handle_system_message(&state, &outbox, connection_id, &events_tx, msg).await?;
                if should_close {
                    let _ = conn.close().await;
                    break;
                }
            }
            Payload::Action(action) => {
                handle_action(&state, &outbox, connection_id, action).await?;
            }
            Payload::Event(_) => {
                tracing::debug!(%connection_id, "ignoring event sent by client");
            }
        }
    }

    // _guard drops here → session disconnect and room leave fire.
    Ok(())
}

/// Receives and validates the Handshake.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    outbox: &Outbox<C>,
) -> Result<(), TallyError> {
    let data = match tokio::time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = state.codec.decode(&data)?;

    let version = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version }) => version,
        _ => {
            outbox.send_error(BAD_REQUEST, "expected Handshake").await?;
            return Err(ProtocolError::InvalidMessage(
                "first message must be Handshake".into(),
            )
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        outbox
            .send_error(
                BAD_REQUEST,
                format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            )
            .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    Ok(())
}

/// Handles a system message. Returns `true` if the connection should close.
async fn handle_system_message<C: Codec>(
    state: &ServerState<C>,
    outbox: &Outbox<C>,
    connection_id: ConnectionId,
    events_tx: &mpsc::UnboundedSender<RoomEvent>,
    msg: SystemMessage,
) -> Result<bool, TallyError> {
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            outbox
                .send_system(SystemMessage::HeartbeatAck {
                    client_time,
                    server_time: outbox.elapsed_ms(),
                })
                .await?;
        }

        SystemMessage::JoinRoom { room_id, name } => {
            let room_id = room_id.unwrap_or_default();
            join_room(state, outbox, connection_id, events_tx, room_id, name).await?;
        }

        SystemMessage::LeaveRoom => {
            let left = state.sessions.lock().await.unbind_room(connection_id);
            match left {
                Some(room_id) => {
                    let result = state
                        .rooms
                        .lock()
                        .await
                        .leave_room(&room_id, connection_id)
                        .await;
                    if let Err(e) = result {
                        tracing::debug!(%connection_id, %room_id, error = %e, "leave room failed");
                    }
                }
                None => outbox.send_error(NOT_IN_ROOM, "not in a room").await?,
            }
        }

        SystemMessage::ListRooms => {
            let rooms: Vec<RoomListEntry> = state
                .rooms
                .lock()
                .await
                .list_rooms()
                .await
                .into_iter()
                .map(RoomListEntry::from)
                .collect();
            outbox.send_system(SystemMessage::RoomList { rooms }).await?;
        }

        SystemMessage::Disconnect { reason } => {
            tracing::info!(%connection_id, %reason, "client disconnected");
            return Ok(true);
        }

        _ => {
            tracing::debug!(%connection_id, "ignoring unexpected system message");
        }
    }

    Ok(false)
}

async fn join_room<C: Codec>(
    state: &ServerState<C>,
    outbox: &Outbox<C>,
    connection_id: ConnectionId,
    events_tx: &mpsc::UnboundedSender<RoomEvent>,
    room_id: RoomId,
    name: String,
) -> Result<(), TallyError> {
    let current = state.sessions.lock().await.room_of(connection_id);
    if let Some(current) = current {
        return outbox
            .send_error(CONFLICT, format!("already in room {current}"))
            .await;
    }

    let joined = state
        .rooms
        .lock()
        .await
        .join_room(&room_id, connection_id, name, events_tx.clone())
        .await;

    match joined {
        Ok(snapshot) => {
            state
                .sessions
                .lock()
                .await
                .bind_room(connection_id, room_id.clone())?;
            tracing::info!(
                %connection_id,
                %room_id,
                is_moderator = snapshot.is_moderator,
                "joined room"
            );
            Ok(())
        }
        Err(e @ RoomError::AlreadyInRoom(..)) => {
            outbox.send_error(CONFLICT, e.to_string()).await
        }
        Err(e) => outbox.send_error(BAD_REQUEST, e.to_string()).await,
    }
}

/// Routes a voting action to the caller's room.
async fn handle_action<C: Codec>(
    state: &ServerState<C>,
    outbox: &Outbox<C>,
    connection_id: ConnectionId,
    action: RoomAction,
) -> Result<(), TallyError> {
    let room_id = state.sessions.lock().await.room_of(connection_id);
    let Some(room_id) = room_id else {
        return outbox.send_error(NOT_IN_ROOM, "not in a room").await;
    };

    // Clone the handle under the lock, send after releasing it.
    let handle = state.rooms.lock().await.handle(&room_id);
    let routed = match handle {
        Some(handle) => handle.send_action(connection_id, action).await,
        None => Err(RoomError::NotFound(room_id)),
    };

    if let Err(e) = routed {
        tracing::debug!(%connection_id, error = %e, "action not routed");
        outbox.send_error(NOT_IN_ROOM, e.to_string()).await?;
    }
    Ok(())
}

/// Pushes room events to the socket until the channel closes or the
/// guard aborts the task.
async fn forward_events<C: Codec>(
    outbox: Arc<Outbox<C>>,
    mut events: mpsc::UnboundedReceiver<RoomEvent>,
) {
    while let Some(event) = events.recv().await {
        if let Err(e) = outbox.send(Payload::Event(event)).await {
            tracing::debug!(error = %e, "event delivery failed, stopping forwarder");
            break;
        }
    }
}

/// Just enough of an envelope to tell which payload kind it carried.
#[derive(Deserialize)]
struct PayloadProbe {
    payload: PayloadTag,
}

#[derive(Deserialize)]
struct PayloadTag {
    #[serde(rename = "type")]
    kind: String,
}

/// Returns `true` for a well-formed frame whose action body did not
/// decode.
fn is_action_frame<C: Codec>(codec: &C, data: &[u8]) -> bool {
    codec
        .decode::<PayloadProbe>(data)
        .is_ok_and(|probe| probe.payload.kind == "Action")
}
