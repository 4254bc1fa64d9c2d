//! Turn coordination.
//!
//! Every inbound frame is either a setup frame (configure one side) or a move
//! frame. The coordinator keeps a [`Board`] mirror of the game so a bad move
//! is rejected before any engine sees it, and so it knows when the two-bit
//! promotion field carries a piece.

use chess_codec::{
    to_board_move, to_standard_move, DecodeError, Frame, FrameLayout, InboundFrame, MoveField,
};
use cozy_chess::{Board, Color, GameStatus, Move, Piece, Rank, Square};
use engine::{format_uci_move, EngineAdapter, EnginePair};

use crate::error::CoordinatorError;

/// Whose move the link expects next, and how each side is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    pub turn: Color,
    pub is_computer: [bool; 2],
    pub difficulty: [u32; 2],
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            turn: Color::White,
            is_computer: [false; 2],
            difficulty: [0; 2],
        }
    }
}

impl GameState {
    pub fn is_computer(&self, color: Color) -> bool {
        self.is_computer[color as usize]
    }
}

pub struct GameCoordinator<E> {
    layout: FrameLayout,
    state: GameState,
    engines: EnginePair<E>,
    board: Board,
}

impl<E: EngineAdapter> GameCoordinator<E> {
    pub fn new(layout: FrameLayout, engines: EnginePair<E>) -> Self {
        Self {
            layout,
            state: GameState::default(),
            engines,
            board: Board::default(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn engines(&self) -> &EnginePair<E> {
        &self.engines
    }

    pub fn into_engines(self) -> EnginePair<E> {
        self.engines
    }

    /// Act on one inbound frame and return the reply frame, if one is owed.
    ///
    /// `None` means the link delivered nothing; state is left alone. On any
    /// decode error the game state, mirror and engines are untouched.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn handle_inbound(
        &mut self,
        frame: Option<Frame>,
    ) -> Result<Option<Frame>, CoordinatorError> {
        let Some(frame) = frame else {
            return Ok(None);
        };
        tracing::debug!("Inbound frame {}", frame);

        let inbound = self.layout.split_inbound(&frame)?;
        if !inbound.is_move {
            self.configure(inbound.color, &inbound.payload).await?;
            return Ok(None);
        }
        if inbound.payload.is_all_zero() {
            return self.open_game().await.map(Some);
        }
        self.play(&inbound).await
    }

    /// Setup frame: reconfigure `color` and start a fresh game.
    async fn configure(&mut self, color: Color, payload: &Frame) -> Result<(), CoordinatorError> {
        let setup = self.layout.decode_setup(payload)?;
        self.reset_game().await?;

        let index = color as usize;
        if setup.is_human {
            self.state.is_computer[index] = false;
            self.state.difficulty[index] = 0;
            tracing::info!("{:?} is played on the board", color);
        } else {
            self.engines.set_skill(color, setup.difficulty).await?;
            self.state.is_computer[index] = true;
            self.state.difficulty[index] = setup.difficulty;
            tracing::info!(
                "{:?} is played by the engine at difficulty {}",
                color,
                setup.difficulty
            );
        }
        Ok(())
    }

    /// All-zero move frame: the board asks for the opening move.
    async fn open_game(&mut self) -> Result<Frame, CoordinatorError> {
        self.reset_game().await?;
        let reply = self.engine_move(Color::White).await?;
        self.state.turn = Color::Black;
        Ok(reply)
    }

    async fn play(&mut self, inbound: &InboundFrame) -> Result<Option<Frame>, CoordinatorError> {
        if inbound.color != self.state.turn {
            tracing::warn!(
                "Move frame tagged {:?} while {:?} is to move",
                inbound.color,
                self.state.turn
            );
        }

        let mv = self.decode_move(&inbound.payload)?;
        let on_board = to_board_move(mv, &self.board);
        self.engines.apply(mv).await?;
        self.board.play_unchecked(on_board);
        tracing::info!("Board played {}", format_uci_move(&mv));

        let next = !self.state.turn;
        let status = self.board.status();
        if status != GameStatus::Ongoing {
            tracing::info!("Game over: {:?}", status);
            self.state.turn = next;
            return Ok(None);
        }

        if self.state.is_computer(next) {
            // The reply is `next`'s own move, so the board keeps the turn.
            return self.engine_move(next).await.map(Some);
        }
        self.state.turn = next;
        Ok(None)
    }

    /// Decode a move payload and check it is legal in the current position.
    /// The result is in standard notation.
    fn decode_move(&self, payload: &Frame) -> Result<Move, DecodeError> {
        let (from, to) = self.layout.move_squares(payload)?;
        let field = self
            .layout
            .decode_move(payload, self.promotion_expected(from, to))?;
        let mv = field.to_move()?;
        if !self.board.is_legal(to_board_move(mv, &self.board)) {
            return Err(DecodeError::IllegalMove(format_uci_move(&mv)));
        }
        Ok(mv)
    }

    /// True when `from` holds a pawn of the side to move and `to` is on its
    /// last rank.
    fn promotion_expected(&self, from: Square, to: Square) -> bool {
        let side = self.board.side_to_move();
        self.board.piece_on(from) == Some(Piece::Pawn)
            && self.board.color_on(from) == Some(side)
            && to.rank() == Rank::Eighth.relative_to(side)
    }

    /// Ask `color`'s engine for a move, play it everywhere and encode it.
    async fn engine_move(&mut self, color: Color) -> Result<Frame, CoordinatorError> {
        let mv = self.engines.best_move(color).await?;
        let on_board = to_board_move(mv, &self.board);
        if !self.board.is_legal(on_board) {
            return Err(CoordinatorError::IllegalEngineMove(format_uci_move(&mv)));
        }
        let mv = to_standard_move(on_board, &self.board);
        let reply = self.layout.encode_move(&MoveField::from_move(mv)?)?;

        self.engines.apply(mv).await?;
        self.board.play_unchecked(on_board);
        tracing::info!("Engine played {} for {:?}", format_uci_move(&mv), color);
        Ok(reply)
    }

    /// Start position on the mirror and both engines, White to move.
    async fn reset_game(&mut self) -> Result<(), CoordinatorError> {
        self.board = Board::default();
        self.state.turn = Color::White;
        self.engines.reset().await?;
        Ok(())
    }
}
