//! Room session authority for BoxFit.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! grid, the offered piece, the score and the player table. All changes
//! to a room go through its mailbox and are applied one at a time.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates rooms on first join, forgets retired ones
//! - [`RoomHandle`] — send intents to a running room actor
//! - [`RoomConfig`] — retire grace, scoring, seeding, palette
//! - [`PlayerSender`] — the channel a room pushes encoded frames into

mod config;
mod dispatch;
mod error;
mod membership;
mod registry;
mod room;

pub use config::{DEFAULT_PALETTE, RoomConfig, RoomPhase};
pub use dispatch::{Frame, PlayerSender};
pub use error::RoomError;
pub use membership::JoinReceipt;
pub use registry::RoomRegistry;
pub use room::{PlacementReceipt, RoomHandle, RoomInfo, RoomSnapshot};
