use anyhow::{bail, Context, Result};
use chessai::config::color_from_answer;
use chessai::{AppConfig, Session, TerminalGame, Termination};
use chessai_agents::{Agent, EngineConfig, UciEngine};
use chessai_core::{Color, GameState};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "chessai=info,chessai_agents=info";

#[derive(Parser)]
#[command(name = "chessai", version, about = "Play chess against a UCI engine in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play a game against the engine (default)
    Play(PlayArgs),
    /// Print the engine's best move for a position
    Bestmove(BestMoveArgs),
}

#[derive(Args, Default)]
struct EngineArgs {
    /// Path to the UCI engine binary
    #[arg(long)]
    engine: Option<PathBuf>,
    /// Search depth per move
    #[arg(long)]
    depth: Option<u8>,
    /// Search time per move in milliseconds
    #[arg(long)]
    movetime: Option<u64>,
}

impl EngineArgs {
    fn apply(self, config: &mut EngineConfig) {
        if let Some(path) = self.engine {
            config.path = path;
        }
        if let Some(depth) = self.depth {
            config.limits.depth = depth;
        }
        if let Some(ms) = self.movetime {
            config.limits.move_time = Duration::from_millis(ms);
        }
    }
}

#[derive(Args, Default)]
struct PlayArgs {
    /// Side to play; asked interactively when omitted
    #[arg(long, value_enum)]
    color: Option<ColorArg>,
    #[command(flatten)]
    engine: EngineArgs,
    /// Start from this position instead of the initial one
    #[arg(long)]
    fen: Option<String>,
    /// Where to write the log while the board is shown
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args)]
struct BestMoveArgs {
    /// Position to analyse; the initial position when omitted
    fen: Option<String>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorArg {
    White,
    Black,
}

impl From<ColorArg> for Color {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::White => Color::White,
            ColorArg::Black => Color::Black,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Play(PlayArgs::default())) {
        Command::Play(args) => play(args),
        Command::Bestmove(args) => best_move(args),
    }
}

fn play(args: PlayArgs) -> Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(color) = args.color {
        config.human = Some(color.into());
    }
    if let Some(fen) = args.fen {
        config.fen = Some(fen);
    }
    if let Some(path) = args.log_file {
        config.log_file = path;
    }
    args.engine.apply(&mut config.engine);

    init_file_logging(&config.log_file)?;

    let rules = start_position(config.fen.as_deref())?;
    let human = match config.human {
        Some(color) => color,
        None => prompt_color()?,
    };
    let engine = UciEngine::spawn(config.engine.clone())
        .with_context(|| format!("failed to start engine {}", config.engine.path.display()))?;
    info!(engine = engine.name(), human = %human, "starting game");

    let mut game = TerminalGame::new(Session::new(rules, engine, human));
    let result = game.run();
    game.shutdown();

    let termination = result.context("terminal error")?;
    println!("{}", termination.describe(human));
    if let Termination::EngineFailure(reason) = termination {
        bail!("game aborted: {}", reason);
    }
    Ok(())
}

fn best_move(args: BestMoveArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();

    let mut config = EngineConfig::from_env();
    args.engine.apply(&mut config);
    let rules = start_position(args.fen.as_deref())?;

    let mut engine = UciEngine::spawn(config.clone())
        .with_context(|| format!("failed to start engine {}", config.path.display()))?;
    let best = engine.best_move(&rules).context("engine search failed")?;
    engine.shutdown();

    match best {
        Some(mv) => println!("{}", mv),
        None => println!("no legal move"),
    }
    Ok(())
}

fn start_position(fen: Option<&str>) -> Result<GameState> {
    match fen {
        Some(fen) => GameState::from_fen(fen).context("invalid start position"),
        None => Ok(GameState::new()),
    }
}

fn prompt_color() -> Result<Color> {
    print!("Play as (w)hite or (b)lack? [w]: ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(color_from_answer(&answer))
}

/// The board owns the terminal while playing, so logs go to a file.
fn init_file_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
