use crate::types::{Color, Move, Piece, PieceKind, SessionOutcome, Square};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Outcome, Position, Role};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("illegal move: {0}")]
    IllegalMove(Move),
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
}

/// Contract the session uses to query and advance a position.
///
/// An implementation owns the position exclusively; callers only issue
/// commands and queries through this trait and never copy the position.
pub trait RulesEngine {
    /// All legal moves in the current position. Castling is reported as the
    /// king's two-square move.
    fn legal_moves(&self) -> Vec<Move>;

    /// Plays `mv`, which must be one of [`RulesEngine::legal_moves`].
    fn apply(&mut self, mv: Move) -> Result<(), RulesError>;

    fn piece_at(&self, square: Square) -> Option<Piece>;

    fn side_to_move(&self) -> Color;

    /// True when the game has ended (mate, stalemate or a draw by rule).
    fn is_terminal(&self) -> bool;

    fn outcome(&self) -> SessionOutcome;

    /// Standard FEN of the current position.
    fn to_fen(&self) -> String;
}

/// Position backed by the `shakmaty` rules library.
#[derive(Clone, Debug, Default)]
pub struct GameState {
    position: Chess,
}

impl GameState {
    /// The standard starting position.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(text: &str) -> Result<Self, RulesError> {
        let fen: Fen = text
            .trim()
            .parse()
            .map_err(|e| RulesError::InvalidFen(format!("{text}: {e}")))?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidFen(format!("{text}: {e}")))?;
        Ok(Self { position })
    }

    fn find_legal(&self, mv: Move) -> Option<shakmaty::Move> {
        self.position
            .legal_moves()
            .into_iter()
            .find(|candidate| convert_move(candidate) == Some(mv))
    }
}

impl RulesEngine for GameState {
    fn legal_moves(&self) -> Vec<Move> {
        self.position
            .legal_moves()
            .iter()
            .filter_map(convert_move)
            .collect()
    }

    fn apply(&mut self, mv: Move) -> Result<(), RulesError> {
        let legal = self.find_legal(mv).ok_or(RulesError::IllegalMove(mv))?;
        self.position.play_unchecked(&legal);
        Ok(())
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position
            .board()
            .piece_at(to_shakmaty_square(square))
            .map(convert_piece)
    }

    fn side_to_move(&self) -> Color {
        convert_color(self.position.turn())
    }

    fn is_terminal(&self) -> bool {
        self.position.is_game_over()
    }

    fn outcome(&self) -> SessionOutcome {
        match self.position.outcome() {
            Some(Outcome::Decisive { winner }) => match convert_color(winner) {
                Color::White => SessionOutcome::WhiteWins,
                Color::Black => SessionOutcome::BlackWins,
            },
            Some(Outcome::Draw) => SessionOutcome::Draw,
            None => SessionOutcome::Ongoing,
        }
    }

    fn to_fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }
}

fn to_shakmaty_square(square: Square) -> shakmaty::Square {
    shakmaty::Square::new(u32::from(square.index()))
}

fn convert_square(square: shakmaty::Square) -> Square {
    Square::from_masked(square as u8)
}

fn convert_color(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}

fn convert_role(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

fn convert_piece(piece: shakmaty::Piece) -> Piece {
    Piece::new(convert_role(piece.role), convert_color(piece.color))
}

/// Converts a shakmaty move to from/to form. Drop moves have no
/// counterpart and yield `None`.
fn convert_move(mv: &shakmaty::Move) -> Option<Move> {
    match *mv {
        shakmaty::Move::Normal {
            from,
            to,
            promotion,
            ..
        } => Some(Move {
            from: convert_square(from),
            to: convert_square(to),
            promotion: promotion.map(convert_role),
        }),
        shakmaty::Move::EnPassant { from, to } => {
            Some(Move::new(convert_square(from), convert_square(to)))
        }
        shakmaty::Move::Castle { king, rook } => {
            // shakmaty encodes castling as king-takes-rook
            let file = if (rook.file() as u8) > (king.file() as u8) {
                shakmaty::File::G
            } else {
                shakmaty::File::C
            };
            let to = shakmaty::Square::from_coords(file, king.rank());
            Some(Move::new(convert_square(king), convert_square(to)))
        }
        shakmaty::Move::Put { .. } => None,
    }
}
