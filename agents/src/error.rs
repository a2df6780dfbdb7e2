use crate::uci::ProtocolError;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch engine `{}`: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("engine did not complete the uci handshake: {reason}")]
    Handshake {
        reason: String,
        #[source]
        source: Option<Box<EngineError>>,
    },
    #[error("engine protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("no reply from engine within {0:?}")]
    Timeout(Duration),
    #[error("engine process exited")]
    Exited,
    #[error("engine I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    /// Wraps a failure seen while waiting for `uciok`, keeping it as the source.
    pub(crate) fn handshake_failed(cause: EngineError) -> Self {
        match cause {
            EngineError::Handshake { .. } | EngineError::Launch { .. } => cause,
            cause => EngineError::Handshake {
                reason: cause.to_string(),
                source: Some(Box::new(cause)),
            },
        }
    }
}
