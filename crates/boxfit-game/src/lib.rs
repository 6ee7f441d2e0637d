//! Game rules for BoxFit.
//!
//! Everything in this crate is synchronous and side-effect free, apart
//! from the random number generator owned by [`PieceGenerator`]. The room
//! layer above wraps these types in an actor and decides *when* to apply
//! them; this crate only decides *what* is legal.
//!
//! - [`Grid`] — the fixed 10×10 board and its occupancy invariant.
//! - [`Shape`] — a rectangular 0/1 matrix with clockwise rotation.
//! - [`PieceKind`] / [`Piece`] — the seven-entry catalog.
//! - [`validate`] / [`check_placement`] — the placement validator.
//! - [`PieceGenerator`] — uniform random piece stream, one per room.

mod catalog;
mod error;
mod generator;
mod grid;
mod shape;
mod validate;

pub use catalog::{Piece, PieceKind};
pub use error::{PlacementError, ShapeError};
pub use generator::PieceGenerator;
pub use grid::{Cell, GRID_SIZE, Grid, Occupant};
pub use shape::{MAX_SHAPE_SIDE, Shape};
pub use validate::{check_placement, validate};
