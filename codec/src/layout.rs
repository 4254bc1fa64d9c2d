//! Versioned frame layouts.
//!
//! The payload always starts with the four 3-bit square coordinates
//! (`start_rank start_file end_rank end_file`, most significant first); the
//! layout decides how wide the trailing promotion field is. Inbound frames
//! prepend a two-bit header (`is_move`, `color`); outbound frames are the bare
//! payload.

use cozy_chess::{Color, File, Rank, Square};

use crate::error::{ConfigError, DecodeError};
use crate::fields::{InboundFrame, MoveField, Promotion, SetupField};
use crate::frame::{mask, Frame};

const SQUARE_BITS: u8 = 12;
const HEADER_BITS: u8 = 2;

/// Width of the promotion field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionBits {
    /// Queen, rook, bishop, knight as 0..=3. The field is only meaningful when
    /// the receiver already knows the move promotes; otherwise it must be 0.
    Two,
    /// 0 for no promotion, then queen, rook, bishop, knight as 1..=4.
    Three,
}

impl PromotionBits {
    pub const fn width(self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameLayout {
    pub version: u8,
    pub promotion: PromotionBits,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::V1
    }
}

impl FrameLayout {
    /// Canonical layout: 14-bit payload, 16-bit inbound frames.
    pub const V1: FrameLayout = FrameLayout {
        version: 1,
        promotion: PromotionBits::Two,
    };

    /// Wide-promotion layout: 15-bit payload, 17-bit inbound frames.
    pub const V2: FrameLayout = FrameLayout {
        version: 2,
        promotion: PromotionBits::Three,
    };

    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }

    pub const fn payload_width(&self) -> u8 {
        SQUARE_BITS + self.promotion.width()
    }

    pub const fn inbound_width(&self) -> u8 {
        HEADER_BITS + self.payload_width()
    }

    pub const fn outbound_width(&self) -> u8 {
        self.payload_width()
    }

    /// Largest difficulty a setup frame can carry. The all-ones payload is
    /// the human sentinel, so it is one below that.
    pub fn max_difficulty(&self) -> u32 {
        mask(self.payload_width()) - 1
    }

    pub fn encode_move(&self, field: &MoveField) -> Result<Frame, DecodeError> {
        field.validate()?;
        let squares = (u32::from(field.start_rank) << 9)
            | (u32::from(field.start_file) << 6)
            | (u32::from(field.end_rank) << 3)
            | u32::from(field.end_file);
        let promo = u32::from(self.promotion_code(field.promotion));
        Frame::new(
            self.payload_width(),
            (squares << self.promotion.width()) | promo,
        )
    }

    /// Decode a move payload.
    ///
    /// `promotion_expected` says whether the move being decoded is a pawn
    /// reaching its last rank; the two-bit layout cannot tell on its own.
    pub fn decode_move(
        &self,
        payload: &Frame,
        promotion_expected: bool,
    ) -> Result<MoveField, DecodeError> {
        self.check_width(payload, self.payload_width())?;
        let promo_width = self.promotion.width();
        let value = payload.value();
        let code = (value & mask(promo_width)) as u8;
        let squares = value >> promo_width;
        let coord = |shift: u32| ((squares >> shift) & 0b111) as u8;

        let field = MoveField {
            start_rank: coord(9),
            start_file: coord(6),
            end_rank: coord(3),
            end_file: coord(0),
            promotion: self.decode_promotion(code, promotion_expected)?,
        };
        field.validate()?;
        Ok(field)
    }

    /// Start and end squares of a move payload, ignoring the promotion
    /// field. Used to find out whether a promotion is expected before
    /// decoding the whole move.
    pub fn move_squares(&self, payload: &Frame) -> Result<(Square, Square), DecodeError> {
        self.check_width(payload, self.payload_width())?;
        let squares = payload.value() >> self.promotion.width();
        let coord = |shift: u32| ((squares >> shift) & 0b111) as usize;
        Ok((
            Square::new(File::ALL[coord(6)], Rank::ALL[coord(9)]),
            Square::new(File::ALL[coord(0)], Rank::ALL[coord(3)]),
        ))
    }

    pub fn encode_setup(&self, is_human: bool, difficulty: u32) -> Result<Frame, ConfigError> {
        let width = self.payload_width();
        if is_human {
            return Ok(Frame::ones(width));
        }
        if difficulty == mask(width) {
            return Err(ConfigError::ReservedDifficulty(difficulty));
        }
        Frame::new(width, difficulty).map_err(|_| ConfigError::DifficultyOutOfRange {
            value: difficulty,
            max: self.max_difficulty(),
        })
    }

    pub fn decode_setup(&self, payload: &Frame) -> Result<SetupField, DecodeError> {
        self.check_width(payload, self.payload_width())?;
        if payload.is_all_ones() {
            Ok(SetupField::human())
        } else {
            Ok(SetupField::computer(payload.value()))
        }
    }

    /// Split an inbound frame into `is_move`, `color`, and payload.
    pub fn split_inbound(&self, frame: &Frame) -> Result<InboundFrame, DecodeError> {
        self.check_width(frame, self.inbound_width())?;
        let is_move = frame.bit(0) == Some(true);
        let color = if frame.bit(1) == Some(true) {
            Color::Black
        } else {
            Color::White
        };
        let payload = frame.slice(HEADER_BITS, self.payload_width())?;
        Ok(InboundFrame::new(is_move, color, payload))
    }

    fn promotion_code(&self, promotion: Option<Promotion>) -> u8 {
        let index = |p: Promotion| match p {
            Promotion::Queen => 0,
            Promotion::Rook => 1,
            Promotion::Bishop => 2,
            Promotion::Knight => 3,
        };
        match (self.promotion, promotion) {
            (_, None) => 0,
            (PromotionBits::Two, Some(p)) => index(p),
            (PromotionBits::Three, Some(p)) => index(p) + 1,
        }
    }

    fn decode_promotion(
        &self,
        code: u8,
        promotion_expected: bool,
    ) -> Result<Option<Promotion>, DecodeError> {
        match self.promotion {
            PromotionBits::Two => {
                if !promotion_expected {
                    return match code {
                        0 => Ok(None),
                        other => Err(DecodeError::UnexpectedPromotion(other)),
                    };
                }
                Promotion::ALL
                    .get(usize::from(code))
                    .copied()
                    .map(Some)
                    .ok_or(DecodeError::PromotionOutOfRange(code))
            }
            PromotionBits::Three => {
                let promotion = match code {
                    0 => None,
                    1..=4 => Some(Promotion::ALL[usize::from(code - 1)]),
                    other => return Err(DecodeError::PromotionOutOfRange(other)),
                };
                match (promotion, promotion_expected) {
                    (Some(_), false) => Err(DecodeError::UnexpectedPromotion(code)),
                    (None, true) => Err(DecodeError::MissingPromotion),
                    (p, _) => Ok(p),
                }
            }
        }
    }

    fn check_width(&self, frame: &Frame, expected: u8) -> Result<(), DecodeError> {
        if frame.width() != expected {
            return Err(DecodeError::WidthMismatch {
                expected,
                actual: frame.width(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e2e4() -> MoveField {
        MoveField {
            start_rank: 1,
            start_file: 4,
            end_rank: 3,
            end_file: 4,
            promotion: None,
        }
    }

    #[test]
    fn test_widths() {
        assert_eq!(FrameLayout::V1.payload_width(), 14);
        assert_eq!(FrameLayout::V1.inbound_width(), 16);
        assert_eq!(FrameLayout::V1.outbound_width(), 14);
        assert_eq!(FrameLayout::V2.inbound_width(), 17);
        assert_eq!(FrameLayout::V1.max_difficulty(), 16382);
    }

    #[test]
    fn test_encode_move_packs_rank_before_file() {
        let frame = FrameLayout::V1.encode_move(&e2e4()).unwrap();
        assert_eq!(frame.to_string(), "00110001110000");
    }

    #[test]
    fn test_encode_move_rejects_bad_square() {
        let field = MoveField {
            end_rank: 9,
            ..e2e4()
        };
        assert_eq!(
            FrameLayout::V1.encode_move(&field),
            Err(DecodeError::SquareOutOfRange {
                field: "end_rank",
                value: 9
            })
        );
    }

    #[test]
    fn test_two_bit_promotion_needs_context() {
        let field = MoveField {
            start_rank: 6,
            start_file: 0,
            end_rank: 7,
            end_file: 0,
            promotion: Some(Promotion::Knight),
        };
        let frame = FrameLayout::V1.encode_move(&field).unwrap();
        assert_eq!(FrameLayout::V1.decode_move(&frame, true).unwrap(), field);
        assert_eq!(
            FrameLayout::V1.decode_move(&frame, false),
            Err(DecodeError::UnexpectedPromotion(3))
        );

        let queen = MoveField {
            promotion: Some(Promotion::Queen),
            ..field
        };
        let frame = FrameLayout::V1.encode_move(&queen).unwrap();
        // Queen shares code 0 with "no promotion".
        assert_eq!(
            FrameLayout::V1.decode_move(&frame, false).unwrap().promotion,
            None
        );
    }

    #[test]
    fn test_three_bit_promotion_rejects_undefined_codes() {
        let frame = Frame::new(15, (0b110_000_111_000 << 3) | 0b101).unwrap();
        assert_eq!(
            FrameLayout::V2.decode_move(&frame, true),
            Err(DecodeError::PromotionOutOfRange(5))
        );
        let frame = Frame::new(15, 0b110_000_111_000 << 3).unwrap();
        assert_eq!(
            FrameLayout::V2.decode_move(&frame, true),
            Err(DecodeError::MissingPromotion)
        );
    }

    #[test]
    fn test_decode_move_checks_width() {
        let frame = Frame::new(16, 0).unwrap();
        assert_eq!(
            FrameLayout::V1.decode_move(&frame, false),
            Err(DecodeError::WidthMismatch {
                expected: 14,
                actual: 16
            })
        );
    }

    #[test]
    fn test_move_squares_ignores_promotion() {
        let layout = FrameLayout::V1;
        let field = MoveField {
            start_rank: 6,
            start_file: 0,
            end_rank: 7,
            end_file: 0,
            promotion: Some(Promotion::Knight),
        };
        let payload = layout.encode_move(&field).unwrap();
        let (from, to) = layout.move_squares(&payload).unwrap();
        assert_eq!(from, Square::A7);
        assert_eq!(to, Square::A8);
    }

    #[test]
    fn test_setup_sentinel() {
        let layout = FrameLayout::V1;
        let human = layout.encode_setup(true, 0).unwrap();
        assert!(human.is_all_ones());
        assert_eq!(layout.decode_setup(&human).unwrap(), SetupField::human());

        let five = layout.encode_setup(false, 5).unwrap();
        assert_eq!(layout.decode_setup(&five).unwrap(), SetupField::computer(5));
    }

    #[test]
    fn test_setup_reserved_and_out_of_range() {
        let layout = FrameLayout::V1;
        assert_eq!(
            layout.encode_setup(false, 16383),
            Err(ConfigError::ReservedDifficulty(16383))
        );
        assert_eq!(
            layout.encode_setup(false, 20000),
            Err(ConfigError::DifficultyOutOfRange {
                value: 20000,
                max: 16382
            })
        );
        assert!(layout.encode_setup(false, 16382).is_ok());
    }

    #[test]
    fn test_split_inbound() {
        let frame = Frame::new(16, 0b01_11111111111111).unwrap();
        let inbound = FrameLayout::V1.split_inbound(&frame).unwrap();
        assert!(!inbound.is_move);
        assert_eq!(inbound.color, Color::Black);
        assert!(inbound.payload.is_all_ones());

        let short = Frame::new(14, 0).unwrap();
        assert!(FrameLayout::V1.split_inbound(&short).is_err());
    }
}
