//! Error types for the protocol layer.
//!
//! Each crate in BoxFit defines its own error enum. A `ProtocolError`
//! always means the bytes or the connect path were wrong, never that a
//! well-formed intent was refused by the game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, missing
    /// required fields, or a shape matrix that is not rectangular 0/1.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The connection path does not name a room and a player.
    #[error("invalid connect path: {0}")]
    InvalidPath(String),
}
