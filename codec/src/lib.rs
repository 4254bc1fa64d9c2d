//! Bit-level codec for the board link.
//!
//! Packs chess moves and per-side setup into the fixed-width frames exchanged
//! with the move-input board. Everything in this crate is a pure transform:
//! no I/O, no timing, no engine state.

pub mod error;
pub mod fields;
pub mod frame;
pub mod layout;
pub mod notation;

pub use error::{ConfigError, DecodeError};
pub use fields::{InboundFrame, MoveField, Promotion, SetupField};
pub use frame::Frame;
pub use layout::{FrameLayout, PromotionBits};
pub use notation::{legal_moves, to_board_move, to_standard_move};
