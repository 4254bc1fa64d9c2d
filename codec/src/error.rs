use thiserror::Error;

/// A frame or move that cannot be interpreted.
///
/// Decode errors reject the whole frame; callers must not apply any part of
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Frame is {actual} bits wide, expected {expected}")]
    WidthMismatch { expected: u8, actual: u8 },

    #[error("Value {value:#x} does not fit in {width} bits")]
    ValueTooWide { value: u32, width: u8 },

    #[error("{field} {value} is outside 0..=7")]
    SquareOutOfRange { field: &'static str, value: u8 },

    #[error("Promotion code {0} is not defined")]
    PromotionOutOfRange(u8),

    #[error("Promotion bits {0:#b} set on a move that does not promote")]
    UnexpectedPromotion(u8),

    #[error("Promotion piece missing on a promoting move")]
    MissingPromotion,

    #[error("{0} cannot be a promotion piece")]
    InvalidPromotionPiece(String),

    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

/// A setup value that the frame layout cannot carry unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The all-ones payload is the human sentinel and never a difficulty.
    #[error("Difficulty {0} is reserved for the human sentinel")]
    ReservedDifficulty(u32),

    #[error("Difficulty {value} exceeds the maximum of {max}")]
    DifficultyOutOfRange { value: u32, max: u32 },
}
