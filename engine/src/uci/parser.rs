use crate::uci::UciError;
use crate::{EngineInfo, Score};
use cozy_chess::{Move, Piece, Square};

/// Incoming message from a UCI engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)`, sent when the side to move has
    /// no legal moves.
    BestMove { mv: Option<Move>, ponder: Option<Move> },
    Info(EngineInfo),
}

/// Parse one line of engine output
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.as_slice() {
        ["uciok", ..] => Ok(UciMessage::UciOk),
        ["readyok", ..] => Ok(UciMessage::ReadyOk),
        ["id", name, value @ ..] if !value.is_empty() => Ok(UciMessage::Id {
            name: name.to_string(),
            value: value.join(" "),
        }),
        ["bestmove", mv, rest @ ..] => {
            let mv = match *mv {
                "(none)" | "0000" => None,
                mv => Some(parse_uci_move(mv)?),
            };
            let ponder = match rest {
                ["ponder", ponder, ..] => parse_uci_move(ponder).ok(),
                _ => None,
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }
        ["info", rest @ ..] => Ok(UciMessage::Info(parse_info_line(rest))),
        ["id", ..] | ["bestmove"] => Err(UciError::MalformedMessage(line.to_string())),
        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse the tokens after "info". Unknown keywords are skipped.
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        let value = tokens.get(i + 1).copied();
        match tokens[i] {
            "depth" => info.depth = value.and_then(|s| s.parse().ok()),
            "seldepth" => info.seldepth = value.and_then(|s| s.parse().ok()),
            "time" => info.time_ms = value.and_then(|s| s.parse().ok()),
            "nodes" => info.nodes = value.and_then(|s| s.parse().ok()),
            "nps" => info.nps = value.and_then(|s| s.parse().ok()),
            "multipv" => info.multipv = value.and_then(|s| s.parse().ok()),
            "hashfull" => info.hashfull = value.and_then(|s| s.parse().ok()),
            "currmove" => info.currmove = value.and_then(|s| parse_uci_move(s).ok()),
            "score" => {
                let amount = tokens.get(i + 2).copied();
                info.score = match value {
                    Some("cp") => amount.and_then(|s| s.parse().ok()).map(Score::Centipawns),
                    Some("mate") => amount.and_then(|s| s.parse().ok()).map(Score::Mate),
                    _ => None,
                };
                i += 3;
                continue;
            }
            "pv" => {
                i += 1;
                while i < tokens.len() && !is_keyword(tokens[i]) {
                    if let Ok(mv) = parse_uci_move(tokens[i]) {
                        info.pv.push(mv);
                    }
                    i += 1;
                }
                continue;
            }
            // The rest of the line is free text.
            "string" => break,
            _ => {
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    info
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "cpuload"
            | "string"
    )
}

/// Parse a move in UCI long algebraic form (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, UciError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(UciError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;
    let promotion = match s.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return Err(UciError::InvalidPromotion(s.to_string())),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

fn parse_square(s: &str) -> Result<Square, UciError> {
    s.parse()
        .map_err(|_| UciError::InvalidSquare(s.to_string()))
}

/// Format a move for UCI ("e2e4", "e7e8q")
pub fn format_uci_move(mv: &Move) -> String {
    let mut s = format!("{}{}", mv.from, mv.to);
    match mv.promotion {
        Some(Piece::Queen) => s.push('q'),
        Some(Piece::Rook) => s.push('r'),
        Some(Piece::Bishop) => s.push('b'),
        Some(Piece::Knight) => s.push('n'),
        _ => {}
    }
    s
}
