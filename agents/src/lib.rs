pub mod config;
pub mod engine;
pub mod error;
pub mod uci;

use chessai_core::{Move, RulesEngine};
use std::time::Duration;

/// Something that picks moves for one side of the board.
pub trait Agent {
    /// Get the best move for the current position, or `None` when the
    /// agent reports that no legal move exists.
    fn best_move(&mut self, position: &dyn RulesEngine) -> Result<Option<Move>, EngineError>;

    /// Get the agent's name
    fn name(&self) -> &str;

    /// Release any external resources. Called once when the game ends.
    fn shutdown(&mut self) {}
}

/// Bounds for a single search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub depth: u8,
    pub move_time: Duration,
}

impl SearchLimits {
    pub fn new(depth: u8, move_time: Duration) -> Self {
        Self { depth, move_time }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            depth: 15,
            move_time: Duration::from_millis(2000),
        }
    }
}

pub use config::{EngineConfig, EngineOptions};
pub use engine::UciEngine;
pub use error::EngineError;
pub use uci::{EngineMessage, ProtocolError, UciCommand};
