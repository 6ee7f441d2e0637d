//! The fixed seven-piece catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Shape;

const I_PATTERN: &[&[u8]] = &[&[1, 1, 1, 1]];
const O_PATTERN: &[&[u8]] = &[&[1, 1], &[1, 1]];
const T_PATTERN: &[&[u8]] = &[&[0, 1, 0], &[1, 1, 1]];
const L_PATTERN: &[&[u8]] = &[&[1, 0, 0], &[1, 1, 1]];
const J_PATTERN: &[&[u8]] = &[&[0, 0, 1], &[1, 1, 1]];
const S_PATTERN: &[&[u8]] = &[&[0, 1, 1], &[1, 1, 0]];
const Z_PATTERN: &[&[u8]] = &[&[1, 1, 0], &[0, 1, 1]];

/// One of the seven tetromino types.
///
/// Serialized as its single-letter name (`"I"`, `"O"`, ...), matching the
/// `type` field of a piece on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

impl PieceKind {
    /// Every catalog entry, in catalog order.
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::L,
        PieceKind::J,
        PieceKind::S,
        PieceKind::Z,
    ];

    /// The shape as authored (identity rotation).
    fn pattern(self) -> &'static [&'static [u8]] {
        match self {
            Self::I => I_PATTERN,
            Self::O => O_PATTERN,
            Self::T => T_PATTERN,
            Self::L => L_PATTERN,
            Self::J => J_PATTERN,
            Self::S => S_PATTERN,
            Self::Z => Z_PATTERN,
        }
    }

    /// The fixed display color for this piece type.
    pub fn color(self) -> &'static str {
        match self {
            Self::I => "#00FFFF",
            Self::O => "#FFFF00",
            Self::T => "#800080",
            Self::L => "#FFA500",
            Self::J => "#0000FF",
            Self::S => "#00FF00",
            Self::Z => "#FF0000",
        }
    }

    /// The authored shape, before any rotation.
    pub fn shape(self) -> Shape {
        Shape::from_pattern(self.pattern())
    }

    /// Returns `true` if `shape` is one of this type's four rotations.
    pub fn matches(self, shape: &Shape) -> bool {
        self.shape().rotations().iter().any(|r| r == shape)
    }

    /// Finds the catalog type whose rotations include `shape`.
    ///
    /// No two types share a rotational state, so the answer is unique.
    pub fn identify(shape: &Shape) -> Option<PieceKind> {
        Self::ALL.into_iter().find(|kind| kind.matches(shape))
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I => "I",
            Self::O => "O",
            Self::T => "T",
            Self::L => "L",
            Self::J => "J",
            Self::S => "S",
            Self::Z => "Z",
        };
        f.write_str(name)
    }
}

/// A piece as offered to the room: its type, current rotation and color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub shape: Shape,
    pub color: String,
}

impl Piece {
    /// A fresh piece of the given type in its authored orientation.
    pub fn new(kind: PieceKind) -> Self {
        Self {
            kind,
            shape: kind.shape(),
            color: kind.color().to_string(),
        }
    }

    /// Returns the same piece turned 90° clockwise.
    pub fn rotated(&self) -> Self {
        Self {
            kind: self.kind,
            shape: self.shape.rotated(),
            color: self.color.clone(),
        }
    }
}
