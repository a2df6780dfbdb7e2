//! Turn-based game session between a human and an [`Agent`].
//!
//! The session owns the position (through a [`RulesEngine`]) and the agent.
//! The presentation layer feeds it board clicks, calls [`Session::advance`]
//! whenever it is the engine's turn, and renders [`Session::snapshot`].
//! Every state change is reported as exactly one [`SessionEvent`].

use crate::error::SessionError;
use chessai_agents::Agent;
use chessai_core::{Color, Move, Piece, PieceKind, RulesEngine, SessionOutcome, Square};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Actor {
    Human,
    Engine,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Human => f.write_str("Human"),
            Actor::Engine => f.write_str("AI"),
        }
    }
}

/// One applied half-move.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HistoryEntry {
    pub actor: Actor,
    pub mv: Move,
    /// UCI text of the move, e.g. `e2e4`.
    pub notation: String,
}

impl HistoryEntry {
    fn new(actor: Actor, mv: Move) -> Self {
        Self {
            actor,
            mv,
            notation: mv.to_string(),
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.actor, self.notation)
    }
}

/// Why a session ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Termination {
    Finished(SessionOutcome),
    /// The engine reported no legal move in a position the rules consider
    /// still in progress.
    NoEngineMove,
    Quit,
    EngineFailure(String),
}

impl Termination {
    /// Final message shown to the player.
    pub fn describe(&self, human: Color) -> String {
        match self {
            Termination::Finished(SessionOutcome::Draw) => "Draw!".to_string(),
            Termination::Finished(SessionOutcome::Ongoing) => "Game over.".to_string(),
            Termination::NoEngineMove => {
                "Game over: the engine reported no legal move.".to_string()
            }
            Termination::Finished(outcome) => {
                let winner = outcome.winner().unwrap_or(human);
                let who = if winner == human { "You won!" } else { "AI won!" };
                format!("{} wins ({})", winner, who)
            }
            Termination::Quit => "Game interrupted by user.".to_string(),
            Termination::EngineFailure(reason) => format!("Engine failure: {}", reason),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    AwaitingHumanSelection,
    AwaitingHumanDestination,
    AwaitingEngineMove,
    GameOver(Termination),
}

impl Phase {
    pub fn is_over(&self) -> bool {
        matches!(self, Phase::GameOver(_))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionEvent {
    SelectionChanged { selection: Option<Square> },
    MoveApplied { entry: HistoryEntry, phase: Phase },
    GameEnded { termination: Termination },
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Clone, Debug)]
pub struct Snapshot<'a> {
    pub pieces: [Option<Piece>; 64],
    pub side_to_move: Color,
    pub human: Color,
    pub selection: Option<Square>,
    pub legal_moves: &'a [Move],
    pub history: &'a [HistoryEntry],
    pub outcome: SessionOutcome,
    pub phase: &'a Phase,
}

impl Snapshot<'_> {
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pieces[square.index() as usize]
    }

    /// True when `square` is a destination of the selected piece.
    pub fn is_destination(&self, square: Square) -> bool {
        self.legal_moves.iter().any(|m| m.to == square)
    }
}

pub struct Session<R, A> {
    rules: R,
    agent: A,
    human: Color,
    phase: Phase,
    selection: Option<Square>,
    legal_moves: Vec<Move>,
    history: Vec<HistoryEntry>,
}

impl<R: RulesEngine, A: Agent> Session<R, A> {
    pub fn new(rules: R, agent: A, human: Color) -> Self {
        let mut session = Session {
            rules,
            agent,
            human,
            phase: Phase::AwaitingHumanSelection,
            selection: None,
            legal_moves: Vec::new(),
            history: Vec::new(),
        };
        session.phase = session.phase_after_move();
        info!(
            human = %human,
            engine = session.agent.name(),
            phase = ?session.phase,
            "session started"
        );
        session
    }

    /// Handles a click on `square`. Clicks that do not change anything
    /// (including any click while the engine is thinking or after the game
    /// ended) return `Ok(None)`.
    pub fn on_square_clicked(
        &mut self,
        square: Square,
    ) -> Result<Option<SessionEvent>, SessionError> {
        match self.phase {
            Phase::AwaitingHumanSelection => {
                if self.is_own_piece(square) {
                    self.select(square);
                    Ok(Some(self.selection_changed()))
                } else {
                    Ok(None)
                }
            }
            Phase::AwaitingHumanDestination => {
                if self.selection != Some(square) && self.is_own_piece(square) {
                    self.select(square);
                    return Ok(Some(self.selection_changed()));
                }
                match self.human_move_to(square) {
                    Some(mv) => self.commit(Actor::Human, mv).map(Some),
                    None => {
                        self.clear_selection();
                        self.phase = Phase::AwaitingHumanSelection;
                        Ok(Some(self.selection_changed()))
                    }
                }
            }
            Phase::AwaitingEngineMove | Phase::GameOver(_) => Ok(None),
        }
    }

    /// Plays the engine's turn. Blocks while the agent searches; does
    /// nothing unless the session is waiting for the engine.
    pub fn advance(&mut self) -> Result<Option<SessionEvent>, SessionError> {
        if self.phase != Phase::AwaitingEngineMove {
            return Ok(None);
        }
        if self.rules.is_terminal() {
            let outcome = self.rules.outcome();
            return Ok(Some(self.finish(Termination::Finished(outcome))));
        }

        debug!(engine = self.agent.name(), "requesting engine move");
        let reply = self.agent.best_move(&self.rules);
        match reply {
            Ok(Some(mv)) => match self.commit(Actor::Engine, mv) {
                Ok(event) => Ok(Some(event)),
                Err(SessionError::Rules(source)) => {
                    self.finish(Termination::EngineFailure(format!(
                        "illegal engine move {}",
                        mv
                    )));
                    Err(SessionError::IllegalEngineMove { mv, source })
                }
                Err(e) => Err(e),
            },
            Ok(None) => {
                let termination = if self.rules.is_terminal() {
                    Termination::Finished(self.rules.outcome())
                } else {
                    warn!("engine reported no legal move in a position the rules consider ongoing");
                    Termination::NoEngineMove
                };
                Ok(Some(self.finish(termination)))
            }
            Err(e) => {
                self.finish(Termination::EngineFailure(e.to_string()));
                Err(SessionError::Engine(e))
            }
        }
    }

    /// Ends the session on the user's request.
    pub fn on_quit(&mut self) -> Option<SessionEvent> {
        if self.phase.is_over() {
            return None;
        }
        Some(self.finish(Termination::Quit))
    }

    /// Releases the agent. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.agent.shutdown();
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        let mut pieces = [None; 64];
        for square in Square::all() {
            pieces[square.index() as usize] = self.rules.piece_at(square);
        }
        Snapshot {
            pieces,
            side_to_move: self.rules.side_to_move(),
            human: self.human,
            selection: self.selection,
            legal_moves: &self.legal_moves,
            history: &self.history,
            outcome: self.rules.outcome(),
            phase: &self.phase,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn selection(&self) -> Option<Square> {
        self.selection
    }

    pub fn legal_moves(&self) -> &[Move] {
        &self.legal_moves
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn human(&self) -> Color {
        self.human
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    fn is_own_piece(&self, square: Square) -> bool {
        let to_move = self.rules.side_to_move();
        matches!(self.rules.piece_at(square), Some(piece) if piece.color == to_move && to_move == self.human)
    }

    fn select(&mut self, square: Square) {
        self.selection = Some(square);
        self.legal_moves = self
            .rules
            .legal_moves()
            .into_iter()
            .filter(|m| m.from == square)
            .collect();
        self.phase = Phase::AwaitingHumanDestination;
        debug!(%square, destinations = self.legal_moves.len(), "selected");
    }

    fn clear_selection(&mut self) {
        self.selection = None;
        self.legal_moves.clear();
    }

    /// The move the selected piece makes to `target`, if legal. Pawns
    /// reaching the last rank always promote to a queen.
    fn human_move_to(&self, target: Square) -> Option<Move> {
        let candidate = *self.legal_moves.iter().find(|m| m.to == target)?;
        let promotes = matches!(
            self.rules.piece_at(candidate.from),
            Some(piece) if piece.kind == PieceKind::Pawn && target.rank() == piece.color.promotion_rank()
        );
        if promotes {
            Some(Move::new_promotion(candidate.from, target, PieceKind::Queen))
        } else {
            Some(candidate)
        }
    }

    fn commit(&mut self, actor: Actor, mv: Move) -> Result<SessionEvent, SessionError> {
        self.rules.apply(mv)?;
        self.clear_selection();

        let entry = HistoryEntry::new(actor, mv);
        info!(ply = self.history.len() + 1, "{}", entry);
        self.history.push(entry.clone());

        self.phase = self.phase_after_move();
        if let Phase::GameOver(termination) = &self.phase {
            info!(result = ?termination, "game over");
        }
        Ok(SessionEvent::MoveApplied {
            entry,
            phase: self.phase.clone(),
        })
    }

    fn phase_after_move(&self) -> Phase {
        if self.rules.is_terminal() {
            Phase::GameOver(Termination::Finished(self.rules.outcome()))
        } else if self.rules.side_to_move() == self.human {
            Phase::AwaitingHumanSelection
        } else {
            Phase::AwaitingEngineMove
        }
    }

    fn finish(&mut self, termination: Termination) -> SessionEvent {
        self.clear_selection();
        info!(result = ?termination, "game over");
        self.phase = Phase::GameOver(termination.clone());
        SessionEvent::GameEnded { termination }
    }

    fn selection_changed(&self) -> SessionEvent {
        SessionEvent::SelectionChanged {
            selection: self.selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_display() {
        let mv = Move::new(Square::parse("e2").unwrap(), Square::parse("e4").unwrap());
        assert_eq!(HistoryEntry::new(Actor::Human, mv).to_string(), "Human: e2e4");
        assert_eq!(HistoryEntry::new(Actor::Engine, mv).to_string(), "AI: e2e4");
    }

    #[test]
    fn test_describe_results() {
        let white = Termination::Finished(SessionOutcome::WhiteWins);
        assert_eq!(white.describe(Color::White), "White wins (You won!)");
        assert_eq!(white.describe(Color::Black), "White wins (AI won!)");

        let black = Termination::Finished(SessionOutcome::BlackWins);
        assert_eq!(black.describe(Color::Black), "Black wins (You won!)");
        assert_eq!(black.describe(Color::White), "Black wins (AI won!)");

        assert_eq!(
            Termination::Finished(SessionOutcome::Draw).describe(Color::White),
            "Draw!"
        );
    }

    #[test]
    fn test_describe_abnormal_endings() {
        assert_eq!(
            Termination::NoEngineMove.describe(Color::White),
            "Game over: the engine reported no legal move."
        );
        assert_eq!(
            Termination::Quit.describe(Color::White),
            "Game interrupted by user."
        );
        assert_eq!(
            Termination::EngineFailure("engine process exited".into()).describe(Color::Black),
            "Engine failure: engine process exited"
        );
    }
}
