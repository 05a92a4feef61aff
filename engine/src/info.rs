//! Search telemetry parsed from an engine `info` line.
use super::score::Score;

use separator::Separatable;

use std::fmt;

/// What an `info` line said about the search in progress. Fields the line did
/// not mention are left unset. The score is already white-relative.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Telemetry {
    pub score: Option<Score>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
}

impl Telemetry {
    pub fn is_empty(&self) -> bool {
        self.score.is_none() && self.depth.is_none() && self.nodes.is_none()
    }
}

/// One line, with thousands separators in node counts.
impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(depth) = self.depth {
            parts.push(format!("depth {}", depth));
        }
        if let Some(score) = self.score {
            parts.push(format!("score {}", score));
        }
        if let Some(nodes) = self.nodes {
            parts.push(format!("nodes {}", nodes.separated_string()));
        }

        write!(f, "{}", parts.join("  "))
    }
}
