pub mod orientation;
pub mod rules;
pub mod types;

pub use orientation::{BoardGeometry, Orientation};
pub use rules::{GameState, RulesEngine, RulesError};
pub use types::*;
