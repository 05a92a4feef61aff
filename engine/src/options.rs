use crate::rules::Side;

/// Location understood by the built-in loader.
pub const DEFAULT_ENGINE: &str = "builtin:random";

/// Controller configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Where to load the engine from.
    pub engine: String,
    /// Search-time budget in milliseconds sent with every `go`.
    pub movetime: u32,
    /// Largest command the mailbox carries, in bytes. Must hold the longest
    /// `position ... moves ...` line of a game plus its `go` line.
    pub mailbox_capacity: usize,
    /// The side the human plays in a new game.
    pub human: Side,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            movetime: 1000,
            mailbox_capacity: 16 * 1024,
            human: Side::White,
        }
    }
}
