//! Castling notation bridging.
//!
//! The board and UCI engines describe castling as the king moving two files
//! (e1g1). cozy-chess describes it as the king capturing its own rook (e1h1).
//! Moves travel in the standard form everywhere except when they are played on
//! a cozy-chess [`Board`].

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

/// Convert a standard-notation move into the form `board` accepts.
///
/// Returns the move unchanged unless it is a castling move that has a legal
/// king-takes-rook counterpart.
pub fn to_board_move(mv: Move, board: &Board) -> Move {
    let is_back_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_king = board.piece_on(mv.from) == Some(Piece::King);

    if !(is_back_rank && is_e_file && is_king && mv.promotion.is_none()) {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G if mv.to.rank() == mv.from.rank() => File::H,
        File::C if mv.to.rank() == mv.from.rank() => File::A,
        _ => return mv,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if legal_moves(board).contains(&converted) {
        converted
    } else {
        mv
    }
}

/// Convert a move legal on `board` into standard notation.
pub fn to_standard_move(mv: Move, board: &Board) -> Move {
    let mover = board.color_on(mv.from);
    let is_castle = board.piece_on(mv.from) == Some(Piece::King)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && mover.is_some()
        && board.color_on(mv.to) == mover;

    if !is_castle {
        return mv;
    }

    let king_file = if mv.to.file() as u8 > mv.from.file() as u8 {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    }
}

/// All legal moves on `board`, in cozy-chess notation.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

#[cfg(test)]
mod tests {
    use super::*;

    fn castling_ready() -> Board {
        "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_kingside_castle_round_trip() {
        let board = castling_ready();
        let standard: Move = "e1g1".parse().unwrap();
        let on_board = to_board_move(standard, &board);
        assert_eq!(on_board, "e1h1".parse::<Move>().unwrap());
        assert_eq!(to_standard_move(on_board, &board), standard);
    }

    #[test]
    fn test_queenside_castle_round_trip() {
        let board = castling_ready();
        let standard: Move = "e1c1".parse().unwrap();
        let on_board = to_board_move(standard, &board);
        assert_eq!(on_board, "e1a1".parse::<Move>().unwrap());
        assert_eq!(to_standard_move(on_board, &board), standard);
    }

    #[test]
    fn test_ordinary_move_unchanged() {
        let board = Board::default();
        let mv: Move = "e2e4".parse().unwrap();
        assert_eq!(to_board_move(mv, &board), mv);
        assert_eq!(to_standard_move(mv, &board), mv);
    }
}
