use chessai_agents::EngineConfig;
use chessai_core::Color;
use std::path::PathBuf;

/// Settings for one game in the terminal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    /// Side the human plays. `None` means ask before the game starts.
    pub human: Option<Color>,
    /// Custom start position.
    pub fen: Option<String>,
    pub log_file: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        AppConfig {
            engine: EngineConfig::from_env(),
            human: std::env::var("CHESSAI_COLOR")
                .ok()
                .and_then(|value| parse_color(&value)),
            fen: std::env::var("CHESSAI_FEN").ok().filter(|fen| !fen.trim().is_empty()),
            log_file: std::env::var_os("CHESSAI_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("chessai.log")),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            engine: EngineConfig::default(),
            human: None,
            fen: None,
            log_file: PathBuf::from("chessai.log"),
        }
    }
}

/// Accepts `white`/`black` and their first letters, case-insensitively.
pub fn parse_color(text: &str) -> Option<Color> {
    match text.trim().to_ascii_lowercase().as_str() {
        "w" | "white" => Some(Color::White),
        "b" | "black" => Some(Color::Black),
        _ => None,
    }
}

/// Color chosen at the interactive prompt. Anything unrecognised means White.
pub fn color_from_answer(answer: &str) -> Color {
    parse_color(answer).unwrap_or(Color::White)
}
