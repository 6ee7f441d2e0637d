//! Wire protocol for BoxFit.
//!
//! This crate defines the "language" that clients and the room authority
//! speak:
//!
//! - **Identity** ([`RoomId`], [`PlayerName`], [`ConnectTarget`]) — who is
//!   talking and in which room, taken from the connection path.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) — closed tagged
//!   unions, one variant per message kind.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`], [`ErrorKind`]) — what can go wrong while
//!   decoding, and how rejections are reported to a client.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (game rules)
//! ```
//!
//! Every message on the wire is `{"type": "<tag>", "data": {...}}`.

mod codec;
mod error;
mod route;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use route::{ConnectTarget, DEFAULT_WS_PREFIX, MAX_IDENT_LEN};
pub use types::{
    ClientMessage, ErrorKind, PlayerInfo, PlayerMap, PlayerName, Position,
    RoomId, ServerMessage,
};
