use chess_codec::DecodeError;
use engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The frame did not describe a usable move or setup. Nothing changed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Engine suggested illegal move {0}")]
    IllegalEngineMove(String),
}
