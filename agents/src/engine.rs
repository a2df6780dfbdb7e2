use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::uci::{parse_engine_line, EngineMessage, UciCommand};
use crate::{Agent, SearchLimits};
use chessai_core::{Move, RulesEngine};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Client for an external engine speaking UCI over a pair of byte streams,
/// normally the standard input and output of a child process.
///
/// Engine output is read on a dedicated thread and handed over through a
/// channel so that every wait on the engine can be bounded.
pub struct UciEngine {
    config: EngineConfig,
    name: Option<String>,
    advertised_options: Vec<String>,
    writer: Box<dyn Write + Send>,
    lines: Receiver<io::Result<String>>,
    process: Option<Child>,
    configured: bool,
    closed: bool,
}

impl UciEngine {
    /// Launches the engine process and completes the `uci`/`uciok` handshake.
    pub fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Launch {
                path: config.path.clone(),
                source,
            })?;
        info!(path = %config.path.display(), pid = child.id(), "engine process started");

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Handshake {
                    reason: "engine pipes unavailable".into(),
                    source: None,
                });
            }
        };

        Self::start(BufReader::new(stdout), stdin, config, Some(child))
    }

    /// Runs the handshake over arbitrary streams instead of a child process.
    pub fn from_streams<R, W>(reader: R, writer: W, config: EngineConfig) -> Result<Self, EngineError>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        Self::start(reader, writer, config, None)
    }

    fn start<R, W>(
        reader: R,
        writer: W,
        config: EngineConfig,
        process: Option<Child>,
    ) -> Result<Self, EngineError>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let lines = spawn_reader(reader)?;
        let mut engine = UciEngine {
            config,
            name: None,
            advertised_options: Vec::new(),
            writer: Box::new(writer),
            lines,
            process,
            configured: false,
            closed: false,
        };

        match engine.handshake() {
            Ok(()) => Ok(engine),
            Err(e) => {
                engine.shutdown();
                Err(EngineError::handshake_failed(e))
            }
        }
    }

    fn handshake(&mut self) -> Result<(), EngineError> {
        self.send(&UciCommand::Uci)?;

        let budget = self.config.handshake_timeout;
        let deadline = Instant::now() + budget;
        loop {
            let line = self.read_line(deadline, budget)?;
            match parse_engine_line(&line) {
                Ok(EngineMessage::UciOk) => break,
                Ok(EngineMessage::Id { name }) => self.name = Some(name),
                Ok(EngineMessage::Option { name }) => self.advertised_options.push(name),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "ignoring line during handshake"),
            }
        }

        info!(
            engine = self.name(),
            options = self.advertised_options.len(),
            "uci handshake complete"
        );
        Ok(())
    }

    /// Writes the configured `setoption` lines once, before the first search.
    fn configure(&mut self) -> Result<(), EngineError> {
        if self.configured {
            return Ok(());
        }

        for (name, value) in self.config.options.as_pairs() {
            let advertised = self
                .advertised_options
                .iter()
                .any(|option| option.eq_ignore_ascii_case(name));
            if !advertised {
                debug!(option = name, "engine did not advertise option");
            }
            self.send(&UciCommand::SetOption {
                name: name.to_string(),
                value,
            })?;
        }

        self.configured = true;
        Ok(())
    }

    /// Asks the engine for its best move in `fen`, blocking until a
    /// `bestmove` line arrives or the reply deadline passes.
    ///
    /// Returns `Ok(None)` when the engine answers `bestmove (none)`. Any
    /// error shuts the engine down, so later requests fail with
    /// [`EngineError::Exited`].
    pub fn request_move(
        &mut self,
        fen: &str,
        limits: &SearchLimits,
    ) -> Result<Option<Move>, EngineError> {
        if self.closed {
            return Err(EngineError::Exited);
        }

        let result = self.search(fen, limits);
        if let Err(e) = &result {
            // The abandoned search may still reply.
            warn!(error = %e, "engine request failed, closing engine");
            self.shutdown();
        }
        result
    }

    fn search(&mut self, fen: &str, limits: &SearchLimits) -> Result<Option<Move>, EngineError> {
        self.configure()?;

        let depth = limits.depth.min(self.config.options.max_depth);
        self.send(&UciCommand::Position {
            fen: fen.to_string(),
        })?;
        self.send(&UciCommand::Go {
            depth,
            move_time: limits.move_time,
        })?;

        let budget = self.config.reply_timeout(limits);
        let deadline = Instant::now() + budget;
        loop {
            let line = self.read_line(deadline, budget)?;
            if let EngineMessage::BestMove(best) = parse_engine_line(&line)? {
                return Ok(best);
            }
        }
    }

    /// Sends `quit` and terminates the engine process. Safe to call more
    /// than once; failures are ignored because the process may already be gone.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.send(&UciCommand::Quit) {
            debug!(error = %e, "quit not delivered");
        }

        let Some(mut child) = self.process.take() else {
            return;
        };
        let deadline = Instant::now() + self.config.shutdown_grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "engine process exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "could not poll engine process");
                    break;
                }
            }
        }
        let _ = child.kill();
        let _ = child.wait();
        debug!("engine process killed");
    }

    /// Options the engine listed during the handshake.
    pub fn advertised_options(&self) -> &[String] {
        &self.advertised_options
    }

    fn send(&mut self, command: &UciCommand) -> Result<(), EngineError> {
        debug!("-> {}", command);
        writeln!(self.writer, "{}", command)?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&self, deadline: Instant, budget: Duration) -> Result<String, EngineError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.lines.recv_timeout(remaining) {
            Ok(Ok(line)) => {
                debug!("<- {}", line);
                Ok(line)
            }
            Ok(Err(e)) => Err(EngineError::Io(e)),
            Err(RecvTimeoutError::Timeout) => Err(EngineError::Timeout(budget)),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Exited),
        }
    }
}

impl Agent for UciEngine {
    fn best_move(&mut self, position: &dyn RulesEngine) -> Result<Option<Move>, EngineError> {
        let limits = self.config.limits;
        self.request_move(&position.to_fen(), &limits)
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("UCI engine")
    }

    fn shutdown(&mut self) {
        UciEngine::shutdown(self);
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Forwards lines from `reader` into a channel until EOF or a read error.
fn spawn_reader<R>(reader: R) -> Result<Receiver<io::Result<String>>, EngineError>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("uci-reader".into())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}
