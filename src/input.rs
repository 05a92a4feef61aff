//! Commands typed at the terminal.
use engine::rules::Side;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Start a new game, the human playing the given side.
    New(Side),
    /// Play a move in coordinate notation.
    Move(String),
    /// Show where the piece on a square can go.
    Drag(String),
    /// Move a piece from one square to another, promoting to a queen.
    Drop(String, String),
    /// Play on against a different engine.
    Swap(String),
    Movetime(u32),
    Export,
    State,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  new [white|black]   start a new game
  <move>              play a move, e.g. e2e4 or e7e8q
  drag <square>       show the legal destinations of a piece
  drop <from> <to>    move a piece, promoting pawns to queens
  swap <location>     replace the engine, keeping the game
  movetime <ms>       set the engine's thinking time
  export              print the game as PGN movetext
  state               show the controller state
  help                show this text
  quit                leave";

fn is_square(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 2 && (b'a'..=b'h').contains(&b[0]) && (b'1'..=b'8').contains(&b[1])
}

fn is_move(s: &str) -> bool {
    (s.len() == 4 || s.len() == 5)
        && s.is_char_boundary(2)
        && s.is_char_boundary(4)
        && is_square(&s[0..2])
        && is_square(&s[2..4])
        && s[4..].chars().all(|c| "qrbn".contains(c))
}

fn square(arg: Option<&str>) -> Result<String, String> {
    match arg {
        Some(sq) if is_square(sq) => Ok(sq.to_string()),
        Some(sq) => Err(format!("not a square: {}", sq)),
        None => Err("expected a square".to_string()),
    }
}

/// Parse one line of user input.
pub fn parse(line: &str) -> Result<Input, String> {
    let mut toks = line.split_whitespace();

    let cmd = match toks.next() {
        Some(cmd) => cmd,
        None => return Err(String::new()),
    };

    let input = match cmd {
        "new" => match toks.next() {
            Some(side) => Input::New(side.parse()?),
            None => Input::New(Side::White),
        },
        "drag" => Input::Drag(square(toks.next())?),
        "drop" => {
            let from = square(toks.next())?;
            let to = square(toks.next())?;
            Input::Drop(from, to)
        }
        "swap" => match toks.next() {
            Some(location) => Input::Swap(location.to_string()),
            None => return Err("expected an engine location".to_string()),
        },
        "movetime" => match toks.next().map(str::parse) {
            Some(Ok(ms)) => Input::Movetime(ms),
            _ => return Err("expected a number of milliseconds".to_string()),
        },
        "export" => Input::Export,
        "state" => Input::State,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        mv if is_move(mv) => Input::Move(mv.to_string()),
        other => return Err(format!("unknown command: {} (try `help`)", other)),
    };

    match toks.next() {
        Some(extra) => Err(format!("unexpected `{}`", extra)),
        None => Ok(input),
    }
}
