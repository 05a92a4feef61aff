//! The sink the controller reports game progress to.
//!
//! Rendering is not the controller's concern. A front-end receives position
//! updates as FEN strings, highlight markers for legal destination squares,
//! engine telemetry and diagnostic text, and decides itself how to show them.

use crate::info::Telemetry;
use crate::rules::{Outcome, Side};

pub trait Frontend {
    /// Show the position described by `fen`.
    fn set_position(&mut self, fen: &str);

    /// Tell the user about a fault which halted the game.
    fn alert(&mut self, message: &str);

    /// Show the board from `side`'s point of view.
    fn set_orientation(&mut self, _side: Side) {}

    fn add_marker(&mut self, _square: &str) {}

    fn clear_markers(&mut self) {}

    fn engine_identified(&mut self, _name: &str) {}

    fn telemetry(&mut self, _telemetry: &Telemetry) {}

    /// Raw text from the engine or its host, for a debug pane.
    fn debug(&mut self, _text: &str) {}

    fn game_over(&mut self, _outcome: Outcome) {}
}
