//! The 10×10 board.

use serde::{Deserialize, Serialize};

use crate::{PlacementError, Shape, check_placement};

/// Side length of the square grid.
pub const GRID_SIZE: usize = 10;

/// Who filled a cell, and with what color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub color: String,
    pub player: String,
}

/// A grid cell: `None` when empty. Serializes as `null` or
/// `{"color": ..., "player": ...}`.
pub type Cell = Option<Occupant>;

/// The board: `GRID_SIZE` rows of `GRID_SIZE` cells, row-major.
///
/// Cells only ever go from empty to occupied. The single mutating method,
/// [`Grid::commit`], validates the whole placement first and writes only
/// if every target cell is free, so no partially placed piece can exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    /// An empty grid.
    pub fn new() -> Self {
        Self {
            cells: std::array::from_fn(|_| std::array::from_fn(|_| None)),
        }
    }

    /// Returns `true` if `(row, col)` lies on the grid.
    pub fn contains(row: i32, col: i32) -> bool {
        let size = GRID_SIZE as i32;
        (0..size).contains(&row) && (0..size).contains(&col)
    }

    /// The occupant of `(row, col)`, or `None` if empty or off-grid.
    pub fn occupant(&self, row: usize, col: usize) -> Option<&Occupant> {
        self.cells.get(row)?.get(col)?.as_ref()
    }

    /// Returns `true` if `(row, col)` is on the grid and empty.
    pub fn is_free(&self, row: usize, col: usize) -> bool {
        row < GRID_SIZE && col < GRID_SIZE && self.cells[row][col].is_none()
    }

    /// Places `shape` with its top-left corner at `(origin_row, origin_col)`.
    ///
    /// Returns the number of cells filled.
    ///
    /// # Errors
    /// Returns the validator's [`PlacementError`] and leaves the grid
    /// untouched if any filled sub-cell is off-grid or already occupied.
    pub fn commit(
        &mut self,
        shape: &Shape,
        origin_row: i32,
        origin_col: i32,
        occupant: &Occupant,
    ) -> Result<usize, PlacementError> {
        check_placement(self, shape, origin_row, origin_col)?;

        let mut filled = 0;
        for (r, c) in shape.filled() {
            // check_placement proved these are in range and empty.
            let row = (origin_row + r as i32) as usize;
            let col = (origin_col + c as i32) as usize;
            self.cells[row][col] = Some(occupant.clone());
            filled += 1;
        }
        Ok(filled)
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_some())
            .count()
    }

    /// Returns `true` once every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.occupied_count() == GRID_SIZE * GRID_SIZE
    }

    /// Iterates the rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell; GRID_SIZE]> {
        self.cells.iter()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}
