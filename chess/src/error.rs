use chessai_agents::EngineError;
use chessai_core::{Move, RulesError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("engine played {mv}, which the rules reject")]
    IllegalEngineMove {
        mv: Move,
        #[source]
        source: RulesError,
    },
    #[error(transparent)]
    Rules(#[from] RulesError),
}
