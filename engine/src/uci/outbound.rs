//! Encoding of commands sent to the engine.
use super::Command;

use std::fmt;

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Uci => write!(f, "uci"),
            Command::IsReady => write!(f, "isready"),
            Command::UciNewGame => write!(f, "ucinewgame"),
            Command::Position { fen, moves } => {
                match fen {
                    Some(fen) => write!(f, "position fen {}", fen)?,
                    None => write!(f, "position startpos")?,
                }

                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }

                Ok(())
            }
            Command::Go { movetime, depth } => {
                write!(f, "go")?;

                if let Some(ms) = movetime {
                    write!(f, " movetime {}", ms)?;
                }

                if let Some(d) = depth {
                    write!(f, " depth {}", d)?;
                }

                Ok(())
            }
            Command::Stop => write!(f, "stop"),
            Command::Quit => write!(f, "quit"),
        }
    }
}

/// Encode `commands` as a single mailbox message, one newline-terminated
/// line per command.
pub fn message(commands: &[Command]) -> String {
    let mut msg = String::new();

    for cmd in commands {
        msg.push_str(&cmd.to_string());
        msg.push('\n');
    }

    msg
}
