//! Transport abstraction layer for BoxFit.
//!
//! Provides the [`Transport`] and [`Connection`] traits: a generic
//! bidirectional message channel that the room layer never looks inside.
//! A connection remembers the request path it was opened on, because the
//! path is what names the room and the player.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    PendingWebSocket, WebSocketConnection, WebSocketTransport,
};

use std::fmt;
use std::time::Duration;

/// Opaque identifier for a connection.
///
/// Unique for the lifetime of the process, so it also tells two
/// connections of the same player apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// Accepting only takes the raw stream off the listener. The protocol
/// handshake runs later through [`Handshake`], on the caller's own task,
/// so a peer that never finishes it cannot hold up the listener.
pub trait Transport: Send + Sync + 'static {
    /// An accepted stream that has not been upgraded yet.
    type Pending: Handshake<Connection = Self::Connection, Error = Self::Error>;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming stream.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// An accepted stream whose protocol handshake has not run yet.
pub trait Handshake: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Completes the handshake. Waits as long as the peer does, so
    /// callers bound it with a timeout.
    async fn handshake(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive messages.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// a pending `recv` never blocks a `send`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one message to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. Cancel
    /// safe: dropping the future never loses a message.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a liveness probe the peer answers at the protocol level.
    async fn ping(&self) -> Result<(), Self::Error>;

    /// Time since the peer last sent anything, control frames included.
    fn idle_for(&self) -> Duration;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The request path the peer connected on, e.g. `/api/ws/lobby/alice`.
    fn path(&self) -> &str;
}
