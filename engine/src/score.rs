use crate::rules::Side;

use std::fmt;
use std::ops::Neg;

/// An evaluation reported by an engine in an `info ... score` clause.
///
/// Engines report scores from their own point of view. [`Score::absolute`]
/// turns that into the white-relative convention used for display, so a
/// positive value always favours the first-seated side.
///
/// Displayed as hundredths of a pawn with two decimals and an explicit sign
/// (`+1.50`, `-0.05`, `+0.00`), or as a signed mate distance (`#3`, `#-2`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Score {
    /// Centipawns.
    Cp(i32),
    /// Mate in the given number of moves. Negative when the reporting side is
    /// being mated.
    Mate(i32),
}

impl Score {
    /// Convert a score reported by an engine playing `engine` into the
    /// white-relative convention.
    pub fn absolute(self, engine: Side) -> Self {
        match engine {
            Side::White => self,
            Side::Black => -self,
        }
    }
}

impl Neg for Score {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Score::Cp(cp) => Score::Cp(-cp),
            Score::Mate(n) => Score::Mate(-n),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Cp(cp) => {
                let sign = if cp < 0 { '-' } else { '+' };
                let abs = cp.unsigned_abs();
                write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
            }
            Score::Mate(n) => write!(f, "#{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centipawns_show_two_decimals_and_sign() {
        assert_eq!(Score::Cp(150).to_string(), "+1.50");
        assert_eq!(Score::Cp(-5).to_string(), "-0.05");
        assert_eq!(Score::Cp(0).to_string(), "+0.00");
        assert_eq!(Score::Cp(-1234).to_string(), "-12.34");
    }

    #[test]
    fn mate_shows_signed_distance() {
        assert_eq!(Score::Mate(3).to_string(), "#3");
        assert_eq!(Score::Mate(-2).to_string(), "#-2");
    }

    #[test]
    fn second_side_scores_are_flipped() {
        assert_eq!(Score::Cp(150).absolute(Side::White).to_string(), "+1.50");
        assert_eq!(Score::Cp(150).absolute(Side::Black).to_string(), "-1.50");
        assert_eq!(Score::Mate(4).absolute(Side::Black), Score::Mate(-4));
        assert_eq!(Score::Cp(0).absolute(Side::Black).to_string(), "+0.00");
    }
}
