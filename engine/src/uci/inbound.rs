//! Interpretation of engine output.
//!
//! Output reaches the controller in chunks whose boundaries have nothing to do
//! with line boundaries. [`LineBuffer`] holds the unterminated tail of the
//! stream and hands back complete lines as terminators arrive; [`parse_line`]
//! turns one complete line into at most one [`Event`].

use crate::info::Telemetry;
use crate::rules::Side;
use crate::score::Score;

/// A protocol event extracted from one line of engine output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// `id name <name...>`
    Identified(String),
    /// `uciok`
    HandshakeDone,
    /// `readyok`
    Ready,
    /// `info ...` carrying at least one of score, depth or nodes.
    Telemetry(Telemetry),
    /// `bestmove <move>`
    BestMove(String),
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Reassembles complete lines from chunked output.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed, in order. A run of
    /// line-break characters terminates a line; empty lines are not returned.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.find(is_line_break) {
            let line: String = self.pending.drain(..end).collect();

            let breaks = self.pending.len() - self.pending.trim_start_matches(is_line_break).len();
            self.pending.drain(..breaks);

            if !line.is_empty() {
                lines.push(line);
            }
        }

        lines
    }

    /// Output received since the last line break.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Interpret one complete line of engine output.
///
/// `engine` is the side the engine is playing; scores are reported from the
/// engine's point of view and are converted to the white-relative convention
/// here. Lines which are not part of the recognised subset yield `None`.
pub fn parse_line(line: &str, engine: Side) -> Option<Event> {
    let mut toks = line.split_whitespace();

    match toks.next()? {
        "bestmove" => toks.next().map(|mv| Event::BestMove(mv.to_string())),
        "id" => parse_id(toks),
        "info" => {
            let telemetry = parse_info(toks, engine);
            if telemetry.is_empty() {
                None
            } else {
                Some(Event::Telemetry(telemetry))
            }
        }
        "uciok" => Some(Event::HandshakeDone),
        "readyok" => Some(Event::Ready),
        _ => None,
    }
}

fn parse_id<'a>(mut toks: impl Iterator<Item = &'a str>) -> Option<Event> {
    if toks.next()? != "name" {
        return None;
    }

    let name = toks.collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        None
    } else {
        Some(Event::Identified(name))
    }
}

fn parse_info<'a>(mut toks: impl Iterator<Item = &'a str>, engine: Side) -> Telemetry {
    let mut telemetry = Telemetry::default();

    while let Some(tok) = toks.next() {
        match tok {
            "score" => {
                if let Some(score) = parse_score(&mut toks) {
                    telemetry.score = Some(score.absolute(engine));
                }
            }
            "depth" => {
                if let Some(depth) = toks.next().and_then(|v| v.parse().ok()) {
                    telemetry.depth = Some(depth);
                }
            }
            "nodes" => {
                if let Some(nodes) = toks.next().and_then(|v| v.parse().ok()) {
                    telemetry.nodes = Some(nodes);
                }
            }
            // Free text runs to the end of the line.
            "string" => break,
            _ => {}
        }
    }

    telemetry
}

fn parse_score<'a>(toks: &mut impl Iterator<Item = &'a str>) -> Option<Score> {
    match toks.next()? {
        "cp" => toks.next()?.parse().ok().map(Score::Cp),
        "mate" => toks.next()?.parse().ok().map(Score::Mate),
        _ => None,
    }
}
