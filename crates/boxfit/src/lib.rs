//! # BoxFit
//!
//! Real-time collaborative polyomino packing on a shared 10×10 grid.
//!
//! Players connect over WebSocket to `/api/ws/{room_id}/{player_name}`,
//! receive the room's full state, and then rotate and place the single
//! offered piece together. Each room is an actor that applies every
//! intent in order, so all players always converge on the same grid and
//! score.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use boxfit::prelude::*;
//!
//! # async fn start() -> Result<(), BoxfitError> {
//! let server = BoxfitServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::BoxfitError;
pub use server::{BoxfitServer, BoxfitServerBuilder};

pub mod prelude {
    pub use crate::{
        BoxfitError, BoxfitServer, BoxfitServerBuilder, ConfigError,
        ServerConfig,
    };
    pub use boxfit_game::{Grid, Piece, PieceKind, Shape};
    pub use boxfit_protocol::{
        ClientMessage, ErrorKind, PlayerName, Position, RoomId, ServerMessage,
    };
    pub use boxfit_room::{RoomConfig, RoomPhase, RoomRegistry};
}
