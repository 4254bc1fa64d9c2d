//! One engine per side, kept on the same game.

use crate::{format_uci_move, EngineAdapter, EngineError};
use cozy_chess::{Color, Move};

/// Two engines, indexed by the color they play.
///
/// Every move of the game is applied to both, so whichever side is asked
/// for a move searches the current position. The pair keeps the move
/// history and replays it into both engines if one of them rejects a move.
pub struct EnginePair<E> {
    engines: [E; 2],
    history: Vec<Move>,
}

impl<E: EngineAdapter> EnginePair<E> {
    pub fn new(white: E, black: E) -> Self {
        Self {
            engines: [white, black],
            history: Vec::new(),
        }
    }

    /// Moves applied since the last reset.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Put both engines back at the starting position.
    pub async fn reset(&mut self) -> Result<(), EngineError> {
        self.history.clear();
        for engine in &mut self.engines {
            engine.reset_position().await?;
        }
        Ok(())
    }

    /// Play `mv` in both engines.
    ///
    /// On failure the move is not recorded and both engines are resynced to
    /// the history, so they still agree with each other.
    pub async fn apply(&mut self, mv: Move) -> Result<(), EngineError> {
        for index in 0..self.engines.len() {
            if let Err(e) = self.engines[index].apply_moves(&[mv]).await {
                tracing::warn!(
                    "Engine {} rejected {}: {}, resyncing",
                    index,
                    format_uci_move(&mv),
                    e
                );
                if let Err(resync) = self.resync().await {
                    tracing::error!("Engine resync failed: {}", resync);
                }
                return Err(e);
            }
        }
        self.history.push(mv);
        Ok(())
    }

    async fn resync(&mut self) -> Result<(), EngineError> {
        for engine in &mut self.engines {
            engine.reset_position().await?;
            if !self.history.is_empty() {
                engine.apply_moves(&self.history).await?;
            }
        }
        Ok(())
    }

    /// Ask the engine playing `color` for its move in the current position.
    pub async fn best_move(&mut self, color: Color) -> Result<Move, EngineError> {
        self.engines[color as usize].best_move().await
    }

    pub async fn set_skill(&mut self, color: Color, level: u32) -> Result<(), EngineError> {
        self.engines[color as usize].set_skill(level).await
    }

    pub fn into_engines(self) -> [E; 2] {
        self.engines
    }
}
