//! Shapes: the rectangular 0/1 matrices that describe a piece.
//!
//! On the wire a shape is an array of rows, each an array of `0`/`1`
//! integers — `[[0,1,0],[1,1,1]]` is the T piece. Inside the server it is
//! a flat `Vec<bool>` plus its dimensions, so a malformed matrix can
//! never exist past decoding.

use serde::{Deserialize, Serialize};

use crate::ShapeError;

/// Largest side length accepted for a shape. Every catalog piece fits.
pub const MAX_SHAPE_SIDE: usize = 4;

/// A rectangular, non-empty boolean matrix.
///
/// `#[serde(try_from, into)]` routes (de)serialization through the
/// row-of-integers form, so decoding a payload runs [`Shape::from_rows`]
/// and rejects ragged or non-binary matrices before any game logic sees
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Shape {
    rows: usize,
    cols: usize,
    /// Row-major, `rows * cols` entries.
    cells: Vec<bool>,
}

impl Shape {
    /// Builds a shape from rows of `0`/`1` entries.
    ///
    /// # Errors
    /// Returns a [`ShapeError`] if the matrix is empty, ragged, larger
    /// than [`MAX_SHAPE_SIDE`], contains anything but 0 and 1, or has no
    /// filled cell.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self, ShapeError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(ShapeError::Empty);
        }
        if height > MAX_SHAPE_SIDE || width > MAX_SHAPE_SIDE {
            return Err(ShapeError::TooLarge {
                rows: height,
                cols: width,
                max: MAX_SHAPE_SIDE,
            });
        }

        let mut cells = Vec::with_capacity(height * width);
        for (row, entries) in rows.iter().enumerate() {
            if entries.len() != width {
                return Err(ShapeError::Ragged {
                    row,
                    expected: width,
                    found: entries.len(),
                });
            }
            for (col, &value) in entries.iter().enumerate() {
                match value {
                    0 => cells.push(false),
                    1 => cells.push(true),
                    _ => return Err(ShapeError::NotBinary { row, col, value }),
                }
            }
        }

        if !cells.contains(&true) {
            return Err(ShapeError::NoFilledCells);
        }

        Ok(Self {
            rows: height,
            cols: width,
            cells,
        })
    }

    /// Builds a shape from a catalog pattern known to be well-formed.
    pub(crate) fn from_pattern(pattern: &[&[u8]]) -> Self {
        let rows = pattern.len();
        let cols = pattern.first().map_or(0, |r| r.len());
        let cells = pattern
            .iter()
            .flat_map(|r| r.iter().map(|&v| v == 1))
            .collect();
        Self { rows, cols, cells }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `true` if the sub-cell at `(row, col)` is filled.
    /// Positions outside the matrix are never filled.
    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col]
    }

    /// Iterates the `(row, col)` offsets of every filled sub-cell in
    /// row-major order.
    pub fn filled(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, filled)| **filled)
            .map(move |(i, _)| (i / cols, i % cols))
    }

    /// Number of filled sub-cells (the piece's size in cells).
    pub fn cell_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    /// Returns this shape rotated 90° clockwise.
    ///
    /// A `rows × cols` shape becomes `cols × rows`: row `i` of the result
    /// is column `i` of the original read bottom to top.
    pub fn rotated(&self) -> Self {
        let (rows, cols) = (self.cols, self.rows);
        let mut cells = Vec::with_capacity(self.cells.len());
        for r in 0..rows {
            for c in 0..cols {
                cells.push(self.is_filled(self.rows - 1 - c, r));
            }
        }
        Self { rows, cols, cells }
    }

    /// The four rotational states, starting with `self`.
    pub fn rotations(&self) -> [Self; 4] {
        let quarter = self.rotated();
        let half = quarter.rotated();
        let three_quarters = half.rotated();
        [self.clone(), quarter, half, three_quarters]
    }

    /// Converts back to rows of `0`/`1`.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|&filled| u8::from(filled)).collect())
            .collect()
    }
}

impl TryFrom<Vec<Vec<u8>>> for Shape {
    type Error = ShapeError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Shape> for Vec<Vec<u8>> {
    fn from(shape: Shape) -> Self {
        shape.to_rows()
    }
}
