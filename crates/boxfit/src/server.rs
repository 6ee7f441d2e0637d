//! `BoxfitServer` builder and server loop.
//!
//! This is the entry point for running a BoxFit server. It ties the
//! layers together: transport → protocol → room.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use boxfit_protocol::JsonCodec;
use boxfit_room::{RoomConfig, RoomRegistry};
use boxfit_transport::{Handshake, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{BoxfitError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) rooms: RoomRegistry,
    pub(crate) codec: JsonCodec,
    pub(crate) path_prefix: String,
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) handshake_timeout: Duration,
    pub(crate) heartbeat_interval: Option<Duration>,
}

/// Builder for configuring and starting a BoxFit server.
///
/// # Example
///
/// ```rust,no_run
/// use boxfit::prelude::*;
///
/// # async fn start() -> Result<(), BoxfitError> {
/// let server = BoxfitServer::builder()
///     .bind("0.0.0.0:8080")
///     .points_per_cell(10)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct BoxfitServerBuilder {
    config: ServerConfig,
}

impl BoxfitServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting with `config`.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the path prefix clients connect under.
    pub fn path_prefix(mut self, prefix: &str) -> Self {
        self.config.path_prefix = prefix.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets how long an empty room lingers before it retires.
    pub fn retire_grace(mut self, grace: Duration) -> Self {
        self.config.room.retire_grace = grace;
        self
    }

    /// Sets the score awarded per placed cell.
    pub fn points_per_cell(mut self, points: u64) -> Self {
        self.config.room.points_per_cell = points;
        self
    }

    /// Seeds every room's piece generator.
    pub fn piece_seed(mut self, seed: u64) -> Self {
        self.config.room.piece_seed = Some(seed);
        self
    }

    /// Closes connections that stay silent for `timeout`.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets how long a peer may take to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets the ping period used to detect dead connections.
    pub fn heartbeat_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Binds the listener and builds the server.
    pub async fn build(self) -> Result<BoxfitServer, BoxfitError> {
        let ServerConfig {
            bind_addr,
            path_prefix,
            room,
            idle_timeout,
            handshake_timeout,
            heartbeat_interval,
        } = self.config;

        let transport = WebSocketTransport::bind(&bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: RoomRegistry::new(room),
            codec: JsonCodec,
            path_prefix,
            idle_timeout,
            handshake_timeout,
            heartbeat_interval,
        });

        Ok(BoxfitServer { transport, state })
    }
}

impl Default for BoxfitServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A BoxFit server bound to its listening address.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BoxfitServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl BoxfitServer {
    /// Creates a new builder.
    pub fn builder() -> BoxfitServerBuilder {
        BoxfitServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room registry, shared with every connection.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.state.rooms
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), BoxfitError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then shuts every
    /// room down.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), BoxfitError> {
        tracing::info!(prefix = %self.state.path_prefix, "BoxFit server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        let peer = pending.peer_addr();
                        // Upgrade off the accept loop; accept never waits
                        // on a peer.
                        tokio::spawn(async move {
                            let upgrade = tokio::time::timeout(
                                state.handshake_timeout,
                                pending.handshake(),
                            );
                            let conn = match upgrade.await {
                                Ok(Ok(conn)) => conn,
                                Ok(Err(e)) => {
                                    tracing::debug!(%peer, error = %e, "handshake failed");
                                    return;
                                }
                                Err(_) => {
                                    tracing::debug!(%peer, "handshake timed out");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("BoxFit server shutting down");
        self.state.rooms.shutdown_all().await;
        self.transport.shutdown().await?;
        Ok(())
    }
}
