use engine::options::{Config, DEFAULT_ENGINE};
use engine::rules::Side;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Engine to play against
    #[clap(short, long, default_value = DEFAULT_ENGINE)]
    engine: String,

    /// Search time per engine move, in milliseconds
    #[clap(short, long, default_value_t = 1000)]
    movetime: u32,

    /// Largest command the engine mailbox can carry, in bytes
    #[clap(long, default_value_t = 16384, parse(try_from_str = parse_capacity))]
    capacity: usize,

    /// The side you play
    #[clap(short, long, default_value = "white")]
    side: Side,

    /// Show raw engine output
    #[clap(short, long)]
    debug: bool,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[clap(short, long, parse(from_occurrences))]
    verbose: u64,

    /// Log level, overriding --verbose
    #[clap(long)]
    log_level: Option<LevelFilter>,
}

fn parse_capacity(s: &str) -> Result<usize, String> {
    let capacity: usize = s.parse().map_err(|_| format!("`{}` is not a byte count", s))?;

    if capacity == 0 || capacity > u32::MAX as usize {
        return Err(format!("must be between 1 and {}", u32::MAX));
    }

    Ok(capacity)
}

impl Args {
    pub fn config(&self) -> Config {
        Config {
            engine: self.engine.clone(),
            movetime: self.movetime,
            mailbox_capacity: self.capacity,
            human: self.side,
        }
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn log_level(&self) -> LevelFilter {
        if let Some(level) = self.log_level {
            return level;
        }

        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
