//! Unified error type for the BoxFit server.

use boxfit_protocol::ProtocolError;
use boxfit_room::RoomError;
use boxfit_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BoxfitError {
    /// A transport-level error (accept, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, connect path).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room refused a join or intent.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error outside the transport (e.g. reading the bound address).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
