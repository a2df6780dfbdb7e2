//! Terminal front-end: draws the session with crossterm and turns mouse
//! clicks and cursor keys into squares.

use crate::session::{Phase, Session, SessionEvent, Snapshot, Termination};
use chessai_agents::Agent;
use chessai_core::{BoardGeometry, Color, Orientation, RulesEngine, Square};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    queue,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
    ExecutableCommand,
};
use std::io::{self, Stdout, Write};
use std::time::Duration;
use tracing::{debug, error};

const BOARD_LEFT: u32 = 3;
const BOARD_TOP: u32 = 5;
const PANEL_LEFT: u16 = 26;
const HISTORY_ROWS: usize = 12;
const HELP: &str = "Click or Enter/space to select and move, hjkl/arrows to move the cursor, q to quit";

enum Input {
    Click(Square),
    Quit,
    Redraw,
}

pub struct TerminalGame<R, A> {
    session: Session<R, A>,
    geometry: BoardGeometry,
    /// Cursor as a screen cell `(column, row)`, row 0 at the top.
    cursor: (u8, u8),
    hover: Option<Square>,
    message: String,
}

impl<R: RulesEngine, A: Agent> TerminalGame<R, A> {
    pub fn new(session: Session<R, A>) -> Self {
        let human = session.human();
        let orientation = Orientation::for_player(human);
        let home = match human {
            Color::White => Square::parse("e2"),
            Color::Black => Square::parse("e7"),
        };
        let cursor = home.map_or((4, 6), |square| orientation.square_to_cell(square));
        Self {
            session,
            geometry: BoardGeometry::new(BOARD_LEFT, BOARD_TOP, 2, 1, orientation),
            cursor,
            hover: None,
            message: String::new(),
        }
    }

    /// Plays until the game ends or the user quits, then restores the
    /// terminal.
    pub fn run(&mut self) -> io::Result<Termination> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(Hide)?;
        stdout.execute(EnableMouseCapture)?;
        stdout.execute(Clear(ClearType::All))?;

        let result = self.game_loop();

        // Cleanup
        stdout.execute(DisableMouseCapture)?;
        stdout.execute(Show)?;
        terminal::disable_raw_mode()?;
        stdout.execute(Clear(ClearType::All))?;
        stdout.execute(MoveTo(0, 0))?;

        result
    }

    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }

    fn game_loop(&mut self) -> io::Result<Termination> {
        loop {
            match self.session.phase() {
                Phase::GameOver(termination) => {
                    let termination = termination.clone();
                    if termination != Termination::Quit {
                        self.message =
                            format!("{} Press any key to exit.", termination.describe(self.session.human()));
                        self.draw()?;
                        wait_for_key()?;
                    }
                    return Ok(termination);
                }
                Phase::AwaitingEngineMove => {
                    self.engine_turn()?;
                    continue;
                }
                Phase::AwaitingHumanSelection | Phase::AwaitingHumanDestination => {}
            }

            self.draw()?;
            match self.read_input()? {
                Input::Click(square) => self.click(square),
                Input::Quit => {
                    self.session.on_quit();
                }
                Input::Redraw => {}
            }
        }
    }

    fn read_input(&mut self) -> io::Result<Input> {
        let input = match event::read()? {
            Event::Key(key) => self.key_input(key),
            Event::Mouse(MouseEvent {
                kind, column, row, ..
            }) => {
                let square = self.geometry.device_to_square(column as u32, row as u32);
                match kind {
                    MouseEventKind::Down(MouseButton::Left) => match square {
                        Some(square) => {
                            self.cursor = self.geometry.orientation.square_to_cell(square);
                            Input::Click(square)
                        }
                        None => Input::Redraw,
                    },
                    MouseEventKind::Moved => {
                        self.hover = square;
                        Input::Redraw
                    }
                    _ => Input::Redraw,
                }
            }
            _ => Input::Redraw,
        };
        Ok(input)
    }

    fn key_input(&mut self, key: KeyEvent) -> Input {
        if key.kind != KeyEventKind::Press {
            return Input::Redraw;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Input::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Input::Quit,
            KeyCode::Char('h') | KeyCode::Left => self.move_cursor(-1, 0),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(0, 1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(0, -1),
            KeyCode::Char('l') | KeyCode::Right => self.move_cursor(1, 0),
            KeyCode::Enter | KeyCode::Char(' ') => {
                match self.geometry.orientation.cell_to_square(self.cursor.0, self.cursor.1) {
                    Some(square) => Input::Click(square),
                    None => Input::Redraw,
                }
            }
            _ => Input::Redraw,
        }
    }

    fn move_cursor(&mut self, dx: i8, dy: i8) -> Input {
        let column = self.cursor.0 as i8 + dx;
        let row = self.cursor.1 as i8 + dy;

        if (0..8).contains(&column) && (0..8).contains(&row) {
            self.cursor = (column as u8, row as u8);
            self.hover = self.geometry.orientation.cell_to_square(self.cursor.0, self.cursor.1);
        }
        Input::Redraw
    }

    fn click(&mut self, square: Square) {
        match self.session.on_square_clicked(square) {
            Ok(Some(SessionEvent::SelectionChanged {
                selection: Some(selected),
            })) => {
                self.message = format!("Selected {}", describe_square(&self.session.snapshot(), selected));
            }
            Ok(Some(SessionEvent::SelectionChanged { selection: None })) => self.message.clear(),
            Ok(Some(SessionEvent::MoveApplied { entry, .. })) => {
                self.message = format!("You played {}", entry.notation);
            }
            Ok(Some(SessionEvent::GameEnded { .. })) | Ok(None) => {}
            Err(e) => {
                error!(error = %e, "move rejected");
                self.message = e.to_string();
            }
        }
    }

    fn engine_turn(&mut self) -> io::Result<()> {
        self.message = String::from("Engine thinking...");
        self.draw()?;

        match self.session.advance() {
            Ok(Some(SessionEvent::MoveApplied { entry, .. })) => {
                self.message = format!("AI played {}", entry.notation);
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "engine turn failed"),
        }

        // Input that arrived during the search is dropped, except a quit.
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if matches!(self.key_input(key), Input::Quit) {
                    debug!("quit requested while the engine was thinking");
                    self.session.on_quit();
                }
            }
        }
        Ok(())
    }

    fn draw(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        let snapshot = self.session.snapshot();

        line(&mut stdout, 0, "chessai - play against a UCI engine")?;
        line(&mut stdout, 1, HELP)?;
        line(&mut stdout, 2, "")?;

        let labels = self.file_labels();
        line(&mut stdout, 3, &labels)?;
        line(&mut stdout, 4, " ┌─────────────────┐")?;
        for row in 0..8u8 {
            self.draw_row(&mut stdout, &snapshot, row)?;
        }
        line(&mut stdout, 13, " └─────────────────┘")?;
        line(&mut stdout, 14, &labels)?;
        line(&mut stdout, 15, "")?;

        let turn = if snapshot.phase.is_over() {
            String::from("Game over")
        } else if snapshot.side_to_move == snapshot.human {
            format!("{} to move (you)", snapshot.side_to_move)
        } else {
            format!("{} to move (AI)", snapshot.side_to_move)
        };
        line(&mut stdout, 16, &turn)?;
        let hover = self
            .hover
            .map(|square| describe_square(&snapshot, square))
            .unwrap_or_default();
        line(&mut stdout, 17, &hover)?;
        line(&mut stdout, 18, &self.message)?;

        draw_history(&mut stdout, &snapshot)?;
        stdout.flush()
    }

    fn draw_row(&self, stdout: &mut Stdout, snapshot: &Snapshot<'_>, row: u8) -> io::Result<()> {
        let orientation = self.geometry.orientation;
        let y = (BOARD_TOP + row as u32) as u16;
        let rank = orientation
            .cell_to_square(0, row)
            .map_or(' ', |square| square.rank().to_char());
        queue!(stdout, MoveTo(0, y), Print(format!("{}│ ", rank)))?;

        for column in 0..8u8 {
            let Some(square) = orientation.cell_to_square(column, row) else {
                continue;
            };
            let (x, _) = self.geometry.square_origin(square);

            let background = if self.cursor == (column, row) {
                TermColor::Yellow
            } else if snapshot.selection == Some(square) {
                TermColor::Green
            } else if snapshot.is_destination(square) {
                TermColor::Blue
            } else if (square.file().index() + square.rank().index()) % 2 == 0 {
                TermColor::DarkGrey
            } else {
                TermColor::Black
            };
            queue!(stdout, MoveTo(x as u16, y), SetBackgroundColor(background))?;

            match snapshot.piece_at(square) {
                Some(piece) => {
                    let foreground = match piece.color {
                        Color::White => TermColor::White,
                        Color::Black => TermColor::Magenta,
                    };
                    queue!(
                        stdout,
                        SetForegroundColor(foreground),
                        Print(format!("{} ", piece.glyph()))
                    )?;
                }
                None => queue!(stdout, Print("  "))?,
            }
            queue!(stdout, ResetColor)?;
        }

        queue!(
            stdout,
            Print(format!("│{}", rank)),
            Clear(ClearType::UntilNewLine)
        )
    }

    fn file_labels(&self) -> String {
        let mut labels = String::from("   ");
        for column in 0..8u8 {
            if let Some(square) = self.geometry.orientation.cell_to_square(column, 0) {
                labels.push(square.file().to_char());
                labels.push(' ');
            }
        }
        labels
    }
}

fn describe_square(snapshot: &Snapshot<'_>, square: Square) -> String {
    match snapshot.piece_at(square) {
        Some(piece) => format!("{} on {}", piece.display_name(), square),
        None => square.to_string(),
    }
}

fn draw_history(stdout: &mut Stdout, snapshot: &Snapshot<'_>) -> io::Result<()> {
    queue!(stdout, MoveTo(PANEL_LEFT, 3), Print("Moves"))?;
    let skip = snapshot.history.len().saturating_sub(HISTORY_ROWS);
    for (offset, (number, entry)) in snapshot.history.iter().enumerate().skip(skip).enumerate() {
        let y = BOARD_TOP as u16 + offset as u16;
        queue!(
            stdout,
            MoveTo(PANEL_LEFT, y),
            Print(format!("{:>3}. {}", number + 1, entry)),
            Clear(ClearType::UntilNewLine)
        )?;
    }
    Ok(())
}

fn line(stdout: &mut Stdout, row: u16, text: &str) -> io::Result<()> {
    queue!(
        stdout,
        MoveTo(0, row),
        Print(text),
        Clear(ClearType::UntilNewLine)
    )
}

fn wait_for_key() -> io::Result<()> {
    loop {
        if let Event::Key(KeyEvent {
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            return Ok(());
        }
    }
}
