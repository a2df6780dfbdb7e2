//! UCI client tests against scripted engine output.

use chessai_agents::{
    Agent, EngineConfig, EngineError, EngineOptions, ProtocolError, SearchLimits, UciEngine,
};
use chessai_core::{GameState, Move, Square};
use crossbeam_channel::{Receiver, Sender};
use std::io::{self, BufReader, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Captures everything the client writes to the engine.
#[derive(Clone, Default)]
struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Serves a fixed script, then blocks until the paired sender is dropped.
struct ScriptThenStall {
    script: Cursor<Vec<u8>>,
    hold: Receiver<()>,
}

impl Read for ScriptThenStall {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.script.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        let _ = self.hold.recv();
        Ok(0)
    }
}

fn stalled_after(script: &str) -> (BufReader<ScriptThenStall>, Sender<()>) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    let reader = ScriptThenStall {
        script: Cursor::new(script.as_bytes().to_vec()),
        hold: rx,
    };
    (BufReader::new(reader), tx)
}

/// Serves chunks pushed through a channel; EOF once the sender is dropped.
struct Feed {
    chunks: Receiver<Vec<u8>>,
    current: Cursor<Vec<u8>>,
}

impl Read for Feed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.current.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            match self.chunks.recv() {
                Ok(chunk) => self.current = Cursor::new(chunk),
                Err(_) => return Ok(0),
            }
        }
    }
}

fn fed(initial: &str) -> (BufReader<Feed>, Sender<Vec<u8>>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(initial.as_bytes().to_vec()).unwrap();
    let reader = Feed {
        chunks: rx,
        current: Cursor::new(Vec::new()),
    };
    (BufReader::new(reader), tx)
}

fn scripted(output: &str) -> Cursor<Vec<u8>> {
    Cursor::new(output.as_bytes().to_vec())
}

fn test_config() -> EngineConfig {
    EngineConfig {
        handshake_timeout: Duration::from_millis(500),
        reply_grace: Duration::from_millis(500),
        limits: SearchLimits::new(12, Duration::from_millis(100)),
        ..EngineConfig::default()
    }
}

fn sq(text: &str) -> Square {
    Square::parse(text).unwrap()
}

const HANDSHAKE: &str = "id name Fakefish 1.0\n\
                         id author Nobody\n\
                         option name Hash type spin default 16 min 1 max 1024\n\
                         option name Skill Level type spin default 20 min 0 max 20\n\
                         uciok\n";

#[test]
fn handshake_records_engine_name_and_options() {
    let transcript = Transcript::default();
    let engine =
        UciEngine::from_streams(scripted(HANDSHAKE), transcript.clone(), test_config()).unwrap();

    assert_eq!(engine.name(), "Fakefish 1.0");
    assert_eq!(engine.advertised_options(), ["Hash", "Skill Level"]);
    assert_eq!(transcript.lines(), ["uci"]);
}

#[test]
fn handshake_fails_when_engine_exits_before_uciok() {
    let result = UciEngine::from_streams(
        scripted("id name Broken\n"),
        Transcript::default(),
        test_config(),
    );
    match result {
        Err(EngineError::Handshake { source, .. }) => {
            assert!(matches!(source.as_deref(), Some(EngineError::Exited)));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("handshake should not succeed"),
    }
}

#[test]
fn handshake_times_out_without_uciok() {
    let (reader, _hold) = stalled_after("id name Silent\n");
    let config = EngineConfig {
        handshake_timeout: Duration::from_millis(50),
        ..test_config()
    };
    let result = UciEngine::from_streams(reader, Transcript::default(), config);
    match result {
        Err(EngineError::Handshake { reason, source }) => {
            assert!(reason.contains("no reply"));
            assert!(matches!(source.as_deref(), Some(EngineError::Timeout(_))));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("handshake should not succeed"),
    }
}

#[test]
fn request_move_writes_options_position_and_go() {
    let output = format!("{HANDSHAKE}info depth 1 score cp 20 pv e7e5\nbestmove e7e5 ponder g1f3\n");
    let transcript = Transcript::default();
    let mut engine =
        UciEngine::from_streams(scripted(&output), transcript.clone(), test_config()).unwrap();

    let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    let best = engine
        .request_move(fen, &SearchLimits::new(12, Duration::from_millis(100)))
        .unwrap();
    assert_eq!(best, Some(Move::new(sq("e7"), sq("e5"))));

    let position_line = format!("position fen {fen}");
    assert_eq!(
        transcript.lines(),
        [
            "uci",
            "setoption name Threads value 1",
            "setoption name Hash value 16",
            "setoption name Skill Level value 20",
            "setoption name Depth value 20",
            position_line.as_str(),
            "go depth 12 movetime 100",
        ]
    );
}

#[test]
fn options_are_written_only_once() {
    let output = format!("{HANDSHAKE}bestmove e7e5\nbestmove g8f6\n");
    let transcript = Transcript::default();
    let mut engine =
        UciEngine::from_streams(scripted(&output), transcript.clone(), test_config()).unwrap();
    let limits = SearchLimits::new(5, Duration::from_millis(100));

    engine.request_move("fen-one", &limits).unwrap();
    engine.request_move("fen-two", &limits).unwrap();

    let setoptions = transcript
        .lines()
        .iter()
        .filter(|line| line.starts_with("setoption"))
        .count();
    assert_eq!(setoptions, 4);
}

#[test]
fn requested_depth_is_capped_by_ceiling() {
    let output = format!("{HANDSHAKE}bestmove e2e4\n");
    let transcript = Transcript::default();
    let config = EngineConfig {
        options: EngineOptions {
            max_depth: 8,
            ..EngineOptions::default()
        },
        ..test_config()
    };
    let mut engine = UciEngine::from_streams(scripted(&output), transcript.clone(), config).unwrap();

    engine
        .request_move("fen", &SearchLimits::new(30, Duration::from_millis(100)))
        .unwrap();
    assert!(transcript
        .lines()
        .contains(&"go depth 8 movetime 100".to_string()));
}

#[test]
fn none_token_means_no_move() {
    let output = format!("{HANDSHAKE}bestmove (none)\n");
    let mut engine =
        UciEngine::from_streams(scripted(&output), Transcript::default(), test_config()).unwrap();
    let best = engine.request_move("fen", &SearchLimits::default()).unwrap();
    assert_eq!(best, None);
}

#[test]
fn short_move_token_is_protocol_error() {
    let output = format!("{HANDSHAKE}bestmove e7e\n");
    let mut engine =
        UciEngine::from_streams(scripted(&output), Transcript::default(), test_config()).unwrap();
    let result = engine.request_move("fen", &SearchLimits::default());
    assert!(matches!(
        result,
        Err(EngineError::Protocol(ProtocolError::InvalidMove(ref token))) if token == "e7e"
    ));
    assert!(matches!(
        engine.request_move("fen", &SearchLimits::default()),
        Err(EngineError::Exited)
    ));
}

#[test]
fn engine_exit_during_search_is_reported() {
    let output = format!("{HANDSHAKE}info depth 1\n");
    let mut engine =
        UciEngine::from_streams(scripted(&output), Transcript::default(), test_config()).unwrap();
    let result = engine.request_move("fen", &SearchLimits::default());
    assert!(matches!(result, Err(EngineError::Exited)));
}

#[test]
fn silent_engine_times_out() {
    let (reader, _hold) = stalled_after(HANDSHAKE);
    let mut engine = UciEngine::from_streams(reader, Transcript::default(), test_config()).unwrap();
    let result = engine.request_move("fen", &SearchLimits::new(5, Duration::from_millis(10)));
    assert!(matches!(result, Err(EngineError::Timeout(_))));
}

#[test]
fn late_reply_after_timeout_is_not_reused() {
    let (reader, feed) = fed(HANDSHAKE);
    let transcript = Transcript::default();
    let config = EngineConfig {
        reply_grace: Duration::from_millis(50),
        ..test_config()
    };
    let mut engine = UciEngine::from_streams(reader, transcript.clone(), config).unwrap();
    let limits = SearchLimits::new(5, Duration::from_millis(10));

    assert!(matches!(
        engine.request_move("fen-one", &limits),
        Err(EngineError::Timeout(_))
    ));
    feed.send(b"bestmove e2e4\n".to_vec()).unwrap();

    assert!(matches!(
        engine.request_move("fen-two", &limits),
        Err(EngineError::Exited)
    ));
    let lines = transcript.lines();
    assert!(!lines.contains(&"position fen fen-two".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("quit"));
}

#[test]
fn agent_asks_for_current_position() {
    let output = format!("{HANDSHAKE}bestmove e2e4\n");
    let transcript = Transcript::default();
    let mut engine =
        UciEngine::from_streams(scripted(&output), transcript.clone(), test_config()).unwrap();

    let best = engine.best_move(&GameState::new()).unwrap();
    assert_eq!(best, Some(Move::new(sq("e2"), sq("e4"))));
    assert!(transcript.lines().contains(
        &"position fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string()
    ));
    assert!(transcript
        .lines()
        .contains(&"go depth 12 movetime 100".to_string()));
}

#[test]
fn shutdown_writes_quit_once() {
    let transcript = Transcript::default();
    let mut engine =
        UciEngine::from_streams(scripted(HANDSHAKE), transcript.clone(), test_config()).unwrap();

    engine.shutdown();
    engine.shutdown();
    drop(engine);

    let quits = transcript
        .lines()
        .iter()
        .filter(|line| *line == "quit")
        .count();
    assert_eq!(quits, 1);
}

#[test]
fn request_after_shutdown_fails() {
    let output = format!("{HANDSHAKE}bestmove e2e4\n");
    let mut engine =
        UciEngine::from_streams(scripted(&output), Transcript::default(), test_config()).unwrap();
    engine.shutdown();
    assert!(matches!(
        engine.request_move("fen", &SearchLimits::default()),
        Err(EngineError::Exited)
    ));
}

#[test]
fn missing_binary_is_launch_error() {
    let config = EngineConfig {
        path: PathBuf::from("/nonexistent/chessai-test-engine"),
        ..test_config()
    };
    assert!(matches!(
        UciEngine::spawn(config),
        Err(EngineError::Launch { .. })
    ));
}
