//! `TallyServer` builder and accept loop.
//!
//! This is where the layers meet: transport → protocol → session → room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tally_protocol::{Codec, JsonCodec};
use tally_room::{RoomConfig, RoomManager};
use tally_session::SessionRegistry;
use tally_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::TallyError;

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// A connection that sends nothing for this long is closed. Clients
    /// keep quiet connections alive with `Heartbeat`.
    pub idle_timeout: Duration,
    /// How long a new connection has to send its `Handshake`.
    pub handshake_timeout: Duration,
    pub room_config: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(5),
            room_config: RoomConfig::default(),
        }
    }
}

/// State shared by every connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionRegistry>,
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Tally server.
///
/// ```rust,no_run
/// # async fn run() -> Result<(), tally::TallyError> {
/// use std::time::Duration;
/// use tally::prelude::*;
///
/// let server = TallyServer::builder()
///     .bind("0.0.0.0:8080")
///     .idle_timeout(Duration::from_secs(60))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TallyServerBuilder {
    config: ServerConfig,
}

impl TallyServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room_config = config;
        self
    }

    /// Binds the listener. Browser clients speak JSON, so the server uses
    /// [`JsonCodec`].
    pub async fn build(self) -> Result<TallyServer<JsonCodec>, TallyError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionRegistry::new()),
            rooms: Mutex::new(RoomManager::with_config(
                self.config.room_config.clone(),
            )),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(TallyServer { transport, state })
    }
}

/// A bound Tally server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TallyServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl TallyServer<JsonCodec> {
    pub fn builder() -> TallyServerBuilder {
        TallyServerBuilder::new()
    }
}

impl<C: Codec + Clone> TallyServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), TallyError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Connections already being served keep running; only the accept
    /// loop stops.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), TallyError> {
        tracing::info!(
            addr = %self.state.config.bind_addr,
            "tally server running"
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        Ok(())
    }
}
