use crate::SearchLimits;
use std::path::PathBuf;
use std::time::Duration;

/// Strength and resource options sent to the engine before the first search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
    /// Stockfish style skill level (0-20).
    pub skill_level: u8,
    /// Upper bound on any requested search depth.
    pub max_depth: u8,
}

impl EngineOptions {
    /// `setoption` name/value pairs, in the order they are written.
    pub fn as_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Threads", self.threads.to_string()),
            ("Hash", self.hash_mb.to_string()),
            ("Skill Level", self.skill_level.to_string()),
            ("Depth", self.max_depth.to_string()),
        ]
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            threads: 1,
            hash_mb: 16,
            skill_level: 20,
            max_depth: 20,
        }
    }
}

/// How to launch and drive a UCI engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    pub options: EngineOptions,
    pub limits: SearchLimits,
    /// Bound on the wait for `uciok`.
    pub handshake_timeout: Duration,
    /// Extra time allowed past `movetime` before a search is abandoned.
    pub reply_grace: Duration,
    /// Time given to the process to exit after `quit` before it is killed.
    pub shutdown_grace: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        let options = EngineOptions {
            threads: env_parse("CHESSAI_THREADS").unwrap_or(defaults.options.threads),
            hash_mb: env_parse("CHESSAI_HASH_MB").unwrap_or(defaults.options.hash_mb),
            skill_level: env_parse("CHESSAI_SKILL").unwrap_or(defaults.options.skill_level),
            max_depth: env_parse("CHESSAI_MAX_DEPTH").unwrap_or(defaults.options.max_depth),
        };
        let limits = SearchLimits {
            depth: env_parse("CHESSAI_DEPTH").unwrap_or(defaults.limits.depth),
            move_time: env_parse("CHESSAI_MOVETIME_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.limits.move_time),
        };

        EngineConfig {
            path: std::env::var_os("CHESSAI_ENGINE")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            options,
            limits,
            handshake_timeout: env_parse("CHESSAI_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.handshake_timeout),
            ..defaults
        }
    }

    /// Longest wait for a `bestmove` line under `limits`.
    pub fn reply_timeout(&self, limits: &SearchLimits) -> Duration {
        limits.move_time + self.reply_grace
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            path: PathBuf::from("stockfish"),
            args: Vec::new(),
            options: EngineOptions::default(),
            limits: SearchLimits::default(),
            handshake_timeout: Duration::from_secs(10),
            reply_grace: Duration::from_secs(10),
            shutdown_grace: Duration::from_millis(200),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
