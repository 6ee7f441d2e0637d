//! Error types for the game rules.

/// A shape matrix that cannot describe a piece.
///
/// Raised while decoding a client payload, so every variant carries
/// enough context to tell the client what was wrong with it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// The matrix has no rows, or its first row has no columns.
    #[error("shape has no rows or columns")]
    Empty,

    /// Rows of different lengths.
    #[error("shape row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// An entry other than 0 or 1.
    #[error("shape entry at ({row}, {col}) is {value}, expected 0 or 1")]
    NotBinary { row: usize, col: usize, value: u8 },

    /// Larger than any catalog piece could ever be.
    #[error("shape is {rows}x{cols}, larger than {max}x{max}")]
    TooLarge { rows: usize, cols: usize, max: usize },

    /// Every entry is 0.
    #[error("shape has no filled cells")]
    NoFilledCells,
}

/// Why a placement was refused by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// A filled sub-cell lands outside the grid.
    #[error("cell ({row}, {col}) is outside the grid")]
    OutOfBounds { row: i32, col: i32 },

    /// A filled sub-cell lands on a cell that is already taken.
    #[error("cell ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },
}
