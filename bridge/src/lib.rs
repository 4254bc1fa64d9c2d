//! Board ↔ engine bridge.
//!
//! Frames arrive from the board over a [`chess_link::BitLink`], the
//! [`GameCoordinator`] turns them into engine calls, and any reply frame goes
//! back over the same link. The link is half duplex, so one frame is in flight
//! at a time.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod run;

pub use coordinator::{GameCoordinator, GameState};
pub use error::CoordinatorError;
pub use run::run;
