pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pair;
pub mod stockfish;
pub mod uci;

pub use error::EngineError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCall, MockEngine};
pub use pair::EnginePair;
pub use stockfish::{EngineConfig, StockfishEngine};
pub use uci::{format_uci_move, parse_uci_move, UciError, UciMessage};

use async_trait::async_trait;
use cozy_chess::Move;

/// What the bridge needs from a chess engine.
///
/// Moves are in standard UCI notation (castling as the king moving two
/// files).
#[async_trait]
pub trait EngineAdapter: Send {
    /// Return to the standard starting position with no moves played.
    async fn reset_position(&mut self) -> Result<(), EngineError>;

    /// Play `moves` on top of the current position.
    async fn apply_moves(&mut self, moves: &[Move]) -> Result<(), EngineError>;

    /// Search the current position and return the engine's choice.
    async fn best_move(&mut self) -> Result<Move, EngineError>;

    async fn set_skill(&mut self, level: u32) -> Result<(), EngineError>;
}

/// Search limits for the "go" command
#[derive(Debug, Clone, Default)]
pub struct GoParams {
    pub movetime: Option<u64>, // Move time in milliseconds
    pub depth: Option<u8>,     // Search depth
}

/// Events received from the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Ready,
    /// `None` when the engine reports `bestmove (none)`.
    BestMove(Option<Move>),
    Info(EngineInfo),
}

/// Engine analysis information
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<Move>, // Principal variation
    pub multipv: Option<u8>,
    pub currmove: Option<Move>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum Score {
    Centipawns(i32),
    Mate(i8), // Negative for being mated
}
