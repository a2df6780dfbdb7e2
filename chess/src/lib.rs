pub mod config;
pub mod error;
pub mod session;
pub mod terminal;

pub use config::AppConfig;
pub use error::SessionError;
pub use session::{Actor, HistoryEntry, Phase, Session, SessionEvent, Snapshot, Termination};
pub use terminal::TerminalGame;
