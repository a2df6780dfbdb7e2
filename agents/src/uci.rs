//! Text codec for the engine side of the UCI protocol.

use chessai_core::{Move, PieceKind, Square};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Token the engine reports when the position has no legal move.
pub const NO_MOVE: &str = "(none)";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed bestmove line: {0:?}")]
    MalformedBestMove(String),
    #[error("invalid move token: {0:?}")]
    InvalidMove(String),
}

/// Commands written to the engine's standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    SetOption { name: String, value: String },
    Position { fen: String },
    Go { depth: u8, move_time: Duration },
    Quit,
}

impl fmt::Display for UciCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciCommand::Uci => f.write_str("uci"),
            UciCommand::SetOption { name, value } => {
                write!(f, "setoption name {} value {}", name, value)
            }
            UciCommand::Position { fen } => write!(f, "position fen {}", fen),
            UciCommand::Go { depth, move_time } => {
                write!(f, "go depth {} movetime {}", depth, move_time.as_millis())
            }
            UciCommand::Quit => f.write_str("quit"),
        }
    }
}

/// Lines read from the engine that the client cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    Id { name: String },
    Option { name: String },
    UciOk,
    /// `None` when the engine answered `bestmove (none)`.
    BestMove(Option<Move>),
    Other,
}

/// Classifies one line of engine output.
pub fn parse_engine_line(line: &str) -> Result<EngineMessage, ProtocolError> {
    let line = line.trim();
    let mut parts = line.split_whitespace();

    match parts.next() {
        Some("uciok") if parts.next().is_none() => Ok(EngineMessage::UciOk),
        Some("id") => match parts.next() {
            Some("name") => Ok(EngineMessage::Id {
                name: parts.collect::<Vec<_>>().join(" "),
            }),
            _ => Ok(EngineMessage::Other),
        },
        Some("option") => Ok(parse_option_name(line)
            .map(|name| EngineMessage::Option { name })
            .unwrap_or(EngineMessage::Other)),
        Some("bestmove") => parse_best_move(line).map(EngineMessage::BestMove),
        _ => Ok(EngineMessage::Other),
    }
}

/// Parses `bestmove <token> [ponder <move>]`.
pub fn parse_best_move(line: &str) -> Result<Option<Move>, ProtocolError> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("bestmove") {
        return Err(ProtocolError::MalformedBestMove(line.to_string()));
    }
    match parts.next() {
        Some(NO_MOVE) => Ok(None),
        Some(token) => parse_move_token(token).map(Some),
        None => Err(ProtocolError::MalformedBestMove(line.to_string())),
    }
}

/// Parses long algebraic move text such as `e2e4` or `e7e8q`.
pub fn parse_move_token(token: &str) -> Result<Move, ProtocolError> {
    let invalid = || ProtocolError::InvalidMove(token.to_string());

    if !token.is_ascii() || !(4..=5).contains(&token.len()) {
        return Err(invalid());
    }

    let from = Square::parse(&token[0..2]).ok_or_else(invalid)?;
    let to = Square::parse(&token[2..4]).ok_or_else(invalid)?;
    let promotion = match token[4..].chars().next() {
        Some(c) => Some(PieceKind::from_promotion_char(c).ok_or_else(invalid)?),
        None => None,
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Extracts `<name>` from `option name <name> type <kind> ...`. Option
/// names may contain spaces (`Skill Level`).
pub fn parse_option_name(line: &str) -> Option<String> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("option") || parts.next() != Some("name") {
        return None;
    }
    let name: Vec<&str> = parts.take_while(|part| *part != "type").collect();
    if name.is_empty() {
        None
    } else {
        Some(name.join(" "))
    }
}
