//! Decoded payload schemas.
//!
//! A payload is read either as a [`MoveField`] or a [`SetupField`], never
//! both; the inbound header's `is_move` bit selects which.

use cozy_chess::{Color, File, Move, Piece, Rank, Square};

use crate::error::DecodeError;
use crate::frame::Frame;

/// Piece a pawn may promote to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    pub const ALL: [Promotion; 4] = [
        Promotion::Queen,
        Promotion::Rook,
        Promotion::Bishop,
        Promotion::Knight,
    ];
}

impl From<Promotion> for Piece {
    fn from(p: Promotion) -> Self {
        match p {
            Promotion::Queen => Piece::Queen,
            Promotion::Rook => Piece::Rook,
            Promotion::Bishop => Piece::Bishop,
            Promotion::Knight => Piece::Knight,
        }
    }
}

impl TryFrom<Piece> for Promotion {
    type Error = DecodeError;

    fn try_from(p: Piece) -> Result<Self, Self::Error> {
        match p {
            Piece::Queen => Ok(Self::Queen),
            Piece::Rook => Ok(Self::Rook),
            Piece::Bishop => Ok(Self::Bishop),
            Piece::Knight => Ok(Self::Knight),
            other => Err(DecodeError::InvalidPromotionPiece(format!("{:?}", other))),
        }
    }
}

/// A move as carried on the wire: four 3-bit coordinates plus an optional
/// promotion piece.
///
/// Coordinates are zero based; rank 0 is the first rank and file 0 the
/// a-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveField {
    pub start_rank: u8,
    pub start_file: u8,
    pub end_rank: u8,
    pub end_file: u8,
    pub promotion: Option<Promotion>,
}

impl MoveField {
    /// Check every coordinate is a real square index.
    pub fn validate(&self) -> Result<(), DecodeError> {
        for (field, value) in [
            ("start_rank", self.start_rank),
            ("start_file", self.start_file),
            ("end_rank", self.end_rank),
            ("end_file", self.end_file),
        ] {
            if value > 7 {
                return Err(DecodeError::SquareOutOfRange { field, value });
            }
        }
        Ok(())
    }

    pub fn from_move(mv: Move) -> Result<Self, DecodeError> {
        Ok(Self {
            start_rank: mv.from.rank() as u8,
            start_file: mv.from.file() as u8,
            end_rank: mv.to.rank() as u8,
            end_file: mv.to.file() as u8,
            promotion: mv.promotion.map(Promotion::try_from).transpose()?,
        })
    }

    pub fn to_move(&self) -> Result<Move, DecodeError> {
        self.validate()?;
        Ok(Move {
            from: square(self.start_file, self.start_rank),
            to: square(self.end_file, self.end_rank),
            promotion: self.promotion.map(Piece::from),
        })
    }
}

fn square(file: u8, rank: u8) -> Square {
    Square::new(File::ALL[usize::from(file)], Rank::ALL[usize::from(rank)])
}

/// Per-side configuration carried by a setup frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetupField {
    pub is_human: bool,
    /// Engine skill level; meaningless when `is_human` is set.
    pub difficulty: u32,
}

impl SetupField {
    pub fn human() -> Self {
        Self {
            is_human: true,
            difficulty: 0,
        }
    }

    pub fn computer(difficulty: u32) -> Self {
        Self {
            is_human: false,
            difficulty,
        }
    }
}

/// An inbound frame split into its header and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundFrame {
    pub is_move: bool,
    pub color: Color,
    pub payload: Frame,
}

impl InboundFrame {
    pub fn new(is_move: bool, color: Color, payload: Frame) -> Self {
        Self {
            is_move,
            color,
            payload,
        }
    }

    /// Reassemble the wire frame: `is_move`, `color`, then the payload.
    pub fn to_frame(&self) -> Result<Frame, DecodeError> {
        let header = Frame::from_bits(&[self.is_move, self.color == Color::Black])?;
        header.concat(&self.payload)
    }
}
