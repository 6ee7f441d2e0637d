//! The placement validator.
//!
//! Pure functions over a grid snapshot. The room actor calls these before
//! committing, and a client could call the same code for a preview; only
//! the server's answer is binding.

use crate::{GRID_SIZE, Grid, PlacementError, Shape};

/// Returns `true` if every filled sub-cell of `shape`, offset by
/// `(origin_row, origin_col)`, lands on an empty in-bounds cell.
pub fn validate(grid: &Grid, shape: &Shape, origin_row: i32, origin_col: i32) -> bool {
    check_placement(grid, shape, origin_row, origin_col).is_ok()
}

/// Like [`validate`], but reports the first offending cell.
///
/// # Errors
/// - [`PlacementError::OutOfBounds`] for the first filled sub-cell off the
///   grid. A shape whose bounding box misses the grid entirely reports its
///   first filled sub-cell.
/// - [`PlacementError::Occupied`] for the first filled sub-cell on a taken
///   cell.
pub fn check_placement(
    grid: &Grid,
    shape: &Shape,
    origin_row: i32,
    origin_col: i32,
) -> Result<(), PlacementError> {
    let size = GRID_SIZE as i32;
    let bottom = origin_row.saturating_add(shape.rows() as i32);
    let right = origin_col.saturating_add(shape.cols() as i32);
    let off_grid = bottom <= 0 || right <= 0 || origin_row >= size || origin_col >= size;

    for (r, c) in shape.filled() {
        let row = origin_row.saturating_add(r as i32);
        let col = origin_col.saturating_add(c as i32);
        if off_grid || !Grid::contains(row, col) {
            return Err(PlacementError::OutOfBounds { row, col });
        }
        let (row, col) = (row as usize, col as usize);
        if grid.occupant(row, col).is_some() {
            return Err(PlacementError::Occupied { row, col });
        }
    }
    Ok(())
}
