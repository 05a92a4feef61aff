//! The line-oriented text protocol spoken with engines.
//!
//! Commands travel to the engine as text written into the session mailbox
//! (`outbound`), and built-in engines read them back with `parse`. Output
//! travels back as arbitrarily chunked text which `inbound` reassembles into
//! lines and interprets as protocol events.

pub mod inbound;
pub mod outbound;
pub mod parse;

pub use inbound::{parse_line, Event, LineBuffer};
pub use outbound::message;
pub use parse::Parser;

/// A command sent to an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Ask the engine to identify itself and enter protocol mode.
    Uci,
    /// Request confirmation that the engine is ready for further commands.
    IsReady,
    /// The next position belongs to a new game, unrelated to earlier searches.
    UciNewGame,
    /// Set up a position, `None` meaning the standard starting position, and
    /// play `moves` from it.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start searching the current position.
    Go {
        movetime: Option<u32>,
        depth: Option<u32>,
    },
    /// Stop searching and report the best move found so far.
    Stop,
    /// Exit the engine.
    Quit,
}
