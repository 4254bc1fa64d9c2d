//! Scripted engine for testing

use crate::{EngineAdapter, EngineError};
use async_trait::async_trait;
use cozy_chess::Move;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Engine double - only compiled in test mode or with the mock feature.
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Default)]
struct MockState {
    best_moves: VecDeque<Move>,
    position: Vec<Move>,
    skill: Option<u32>,
    fail_next_apply: bool,
    fail_next_skill: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ResetPosition,
    ApplyMoves(Vec<Move>),
    BestMove,
    SetSkill(u32),
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for `best_move`, returned in order.
    pub fn with_best_moves(self, moves: impl IntoIterator<Item = Move>) -> Self {
        self.state.lock().unwrap().best_moves.extend(moves);
        self
    }

    pub fn push_best_move(&self, mv: Move) {
        self.state.lock().unwrap().best_moves.push_back(mv);
    }

    /// Make the next `apply_moves` call fail without changing the position.
    pub fn fail_next_apply(&self) {
        self.state.lock().unwrap().fail_next_apply = true;
    }

    /// Make the next `set_skill` call fail without changing the skill.
    pub fn fail_next_skill(&self) {
        self.state.lock().unwrap().fail_next_skill = true;
    }

    /// Moves played since the last reset.
    pub fn position(&self) -> Vec<Move> {
        self.state.lock().unwrap().position.clone()
    }

    pub fn skill(&self) -> Option<u32> {
        self.state.lock().unwrap().skill
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    fn log(&self, call: MockCall) {
        self.call_log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EngineAdapter for MockEngine {
    async fn reset_position(&mut self) -> Result<(), EngineError> {
        self.log(MockCall::ResetPosition);
        self.state.lock().unwrap().position.clear();
        Ok(())
    }

    async fn apply_moves(&mut self, moves: &[Move]) -> Result<(), EngineError> {
        self.log(MockCall::ApplyMoves(moves.to_vec()));
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next_apply) {
            return Err(EngineError::Closed);
        }
        state.position.extend_from_slice(moves);
        Ok(())
    }

    async fn best_move(&mut self) -> Result<Move, EngineError> {
        self.log(MockCall::BestMove);
        self.state
            .lock()
            .unwrap()
            .best_moves
            .pop_front()
            .ok_or(EngineError::NotConfigured("best_move"))
    }

    async fn set_skill(&mut self, level: u32) -> Result<(), EngineError> {
        self.log(MockCall::SetSkill(level));
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next_skill) {
            return Err(EngineError::Closed);
        }
        state.skill = Some(level);
        Ok(())
    }
}
