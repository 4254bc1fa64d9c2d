use std::time::Duration;

use crate::uci::UciError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Stockfish not found")]
    NotFound,

    #[error("Failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine closed its output")]
    Closed,

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),

    #[error("Engine has no legal move")]
    NoLegalMove,

    #[error(transparent)]
    Uci(#[from] UciError),

    #[error("Mock response not configured for: {0}")]
    NotConfigured(&'static str),
}
