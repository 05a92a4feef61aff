//! The rules collaborator.
//!
//! The controller never interprets chess itself. It asks a [`Rules`]
//! implementation whose turn it is, whether a move is legal, whether the game
//! is over, and for the move history it replays to the engine. [`ChessRules`]
//! is the standard implementation, backed by `shakmaty`.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position, Square};

use std::fmt;
use std::str::FromStr;

/// One of the two seats at the board. White moves first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "white"),
            Side::Black => write!(f, "black"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" | "w" => Ok(Side::White),
            "black" | "b" => Ok(Side::Black),
            _ => Err(format!("expected `white` or `black`, got `{}`", s)),
        }
    }
}

/// How a finished game ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: Side },
    Stalemate,
    InsufficientMaterial,
    FiftyMoves,
}

impl Outcome {
    /// The PGN result token.
    pub fn result(&self) -> &'static str {
        match self {
            Outcome::Checkmate { winner: Side::White } => "1-0",
            Outcome::Checkmate { winner: Side::Black } => "0-1",
            _ => "1/2-1/2",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Checkmate { winner } => write!(f, "checkmate, {} wins", winner),
            Outcome::Stalemate => write!(f, "draw by stalemate"),
            Outcome::InsufficientMaterial => write!(f, "draw by insufficient material"),
            Outcome::FiftyMoves => write!(f, "draw by the fifty-move rule"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RulesError {
    /// The text is not a move in compact coordinate notation.
    Malformed(String),
    /// The move is well formed but not legal in the current position.
    Illegal(String),
    /// No moves can be played once the game has ended.
    GameOver,
    /// A starting position could not be set up.
    InvalidPosition(String),
}

impl fmt::Display for RulesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulesError::Malformed(mv) => write!(f, "malformed move `{}`", mv),
            RulesError::Illegal(mv) => write!(f, "illegal move `{}`", mv),
            RulesError::GameOver => write!(f, "the game is over"),
            RulesError::InvalidPosition(fen) => write!(f, "invalid position `{}`", fen),
        }
    }
}

impl std::error::Error for RulesError {}

/// The capability the controller needs from a rules engine.
///
/// Moves are exchanged in the engine's compact coordinate notation (`e2e4`,
/// `e7e8q`) and squares by name (`e2`).
pub trait Rules {
    /// Return to the initial position and forget the history.
    fn reset(&mut self);

    fn side_to_move(&self) -> Side;

    /// Play `mv` if it is legal. A rejected move leaves the game untouched.
    fn play(&mut self, mv: &str) -> Result<(), RulesError>;

    /// Every move played since the initial position.
    fn history(&self) -> &[String];

    /// The initial position as a FEN string, or `None` for the standard
    /// starting position.
    fn initial_fen(&self) -> Option<String>;

    /// The current position as a FEN string.
    fn fen(&self) -> String;

    /// Destination squares of the legal moves starting on `square`.
    fn legal_targets(&self, square: &str) -> Vec<String>;

    /// The side owning the piece on `square`, if any.
    fn owner(&self, square: &str) -> Option<Side>;

    /// `Some` once the game has ended by checkmate or a draw.
    fn outcome(&self) -> Option<Outcome>;

    /// The game so far as PGN movetext, terminated by the result token.
    fn record(&self) -> String;
}

/// Standard chess.
#[derive(Clone, Debug)]
pub struct ChessRules {
    initial: Chess,
    initial_fen: Option<String>,
    pos: Chess,
    history: Vec<String>,
    sans: Vec<String>,
}

impl ChessRules {
    pub fn new() -> Self {
        Self::starting_from(Chess::default(), None)
    }

    /// Start from an arbitrary position. `reset` returns here.
    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let invalid = || RulesError::InvalidPosition(fen.to_string());

        let setup: Fen = fen.parse().map_err(|_| invalid())?;
        let pos: Chess = setup
            .into_position(CastlingMode::Standard)
            .map_err(|_| invalid())?;

        let normalized = Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string();
        Ok(Self::starting_from(pos, Some(normalized)))
    }

    fn starting_from(pos: Chess, initial_fen: Option<String>) -> Self {
        Self {
            initial: pos.clone(),
            initial_fen,
            pos,
            history: Vec::new(),
            sans: Vec::new(),
        }
    }
}

impl Default for ChessRules {
    fn default() -> Self {
        Self::new()
    }
}

impl Rules for ChessRules {
    fn reset(&mut self) {
        self.pos = self.initial.clone();
        self.history.clear();
        self.sans.clear();
    }

    fn side_to_move(&self) -> Side {
        self.pos.turn().into()
    }

    fn play(&mut self, mv: &str) -> Result<(), RulesError> {
        if self.outcome().is_some() {
            return Err(RulesError::GameOver);
        }

        let uci: UciMove = mv
            .parse()
            .map_err(|_| RulesError::Malformed(mv.to_string()))?;
        let m = uci
            .to_move(&self.pos)
            .map_err(|_| RulesError::Illegal(mv.to_string()))?;

        self.history
            .push(m.to_uci(CastlingMode::Standard).to_string());
        let san = SanPlus::from_move_and_play_unchecked(&mut self.pos, &m);
        self.sans.push(san.to_string());

        Ok(())
    }

    fn history(&self) -> &[String] {
        &self.history
    }

    fn initial_fen(&self) -> Option<String> {
        self.initial_fen.clone()
    }

    fn fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    fn legal_targets(&self, square: &str) -> Vec<String> {
        let from: Square = match square.parse() {
            Ok(sq) => sq,
            Err(_) => return Vec::new(),
        };

        let mut targets: Vec<String> = self
            .pos
            .legal_moves()
            .iter()
            .filter(|m| m.from() == Some(from))
            .filter_map(|m| match m.to_uci(CastlingMode::Standard) {
                UciMove::Normal { to, .. } => Some(to.to_string()),
                _ => None,
            })
            .collect();

        targets.sort();
        targets.dedup();
        targets
    }

    fn owner(&self, square: &str) -> Option<Side> {
        let sq: Square = square.parse().ok()?;
        self.pos.board().color_at(sq).map(Side::from)
    }

    fn outcome(&self) -> Option<Outcome> {
        if self.pos.is_checkmate() {
            Some(Outcome::Checkmate {
                winner: Side::from(!self.pos.turn()),
            })
        } else if self.pos.is_stalemate() {
            Some(Outcome::Stalemate)
        } else if self.pos.is_insufficient_material() {
            Some(Outcome::InsufficientMaterial)
        } else if self.pos.halfmoves() >= 100 {
            Some(Outcome::FiftyMoves)
        } else {
            None
        }
    }

    fn record(&self) -> String {
        let mut record = String::new();
        let black_first = self.initial.turn() == Color::Black;
        let first_move = u32::from(self.initial.fullmoves());

        for (i, san) in self.sans.iter().enumerate() {
            let ply = i + usize::from(black_first);
            let number = first_move as usize + ply / 2;

            if ply % 2 == 0 {
                record.push_str(&format!("{}. ", number));
            } else if i == 0 {
                record.push_str(&format!("{}... ", number));
            }

            record.push_str(san);
            record.push(' ');
        }

        record.push_str(self.outcome().map_or("*", |o| o.result()));
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_all(rules: &mut ChessRules, moves: &[&str]) {
        for mv in moves {
            rules.play(mv).unwrap();
        }
    }

    #[test]
    fn starts_with_white_to_move() {
        let rules = ChessRules::new();

        assert_eq!(rules.side_to_move(), Side::White);
        assert!(rules.history().is_empty());
        assert_eq!(
            rules.fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn initial_fen_is_only_set_for_custom_starts() {
        assert_eq!(ChessRules::new().initial_fen(), None);

        let rules = ChessRules::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(
            rules.initial_fen().as_deref(),
            Some("8/8/4k3/8/8/3K4/8/8 w - - 0 1")
        );
    }

    #[test]
    fn legal_moves_are_recorded() {
        let mut rules = ChessRules::new();

        play_all(&mut rules, &["e2e4", "e7e5"]);
        assert_eq!(rules.history(), ["e2e4", "e7e5"]);
        assert_eq!(rules.side_to_move(), Side::White);
    }

    #[test]
    fn rejected_moves_change_nothing() {
        let mut rules = ChessRules::new();
        let before = rules.fen();

        assert_eq!(
            rules.play("e2e5"),
            Err(RulesError::Illegal("e2e5".to_string()))
        );
        assert_eq!(
            rules.play("bogus"),
            Err(RulesError::Malformed("bogus".to_string()))
        );
        assert_eq!(rules.fen(), before);
        assert!(rules.history().is_empty());
    }

    #[test]
    fn checkmate_ends_the_game() {
        let mut rules = ChessRules::new();

        play_all(&mut rules, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(
            rules.outcome(),
            Some(Outcome::Checkmate {
                winner: Side::Black
            })
        );
        assert_eq!(rules.play("a2a3"), Err(RulesError::GameOver));
        assert_eq!(rules.record(), "1. f3 e5 2. g4 Qh4# 0-1");
    }

    #[test]
    fn stalemate_is_a_draw() {
        let rules = ChessRules::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();

        assert_eq!(rules.outcome(), Some(Outcome::Stalemate));
        assert_eq!(Outcome::Stalemate.result(), "1/2-1/2");
    }

    #[test]
    fn bare_kings_are_a_draw() {
        let rules = ChessRules::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();

        assert_eq!(rules.outcome(), Some(Outcome::InsufficientMaterial));
    }

    #[test]
    fn targets_are_destination_squares() {
        let rules = ChessRules::new();

        assert_eq!(rules.legal_targets("e2"), ["e3", "e4"]);
        assert_eq!(rules.legal_targets("g1"), ["f3", "h3"]);
        assert!(rules.legal_targets("e1").is_empty());
        assert!(rules.legal_targets("z9").is_empty());
    }

    #[test]
    fn castling_target_is_the_kings_square() {
        let rules =
            ChessRules::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

        let targets = rules.legal_targets("e1");
        assert!(targets.contains(&"g1".to_string()));
        assert!(targets.contains(&"c1".to_string()));
    }

    #[test]
    fn promotions_collapse_to_one_target() {
        let rules = ChessRules::from_fen("8/4P3/8/8/8/k7/8/K7 w - - 0 1").unwrap();

        assert_eq!(rules.legal_targets("e7"), ["e8"]);
    }

    #[test]
    fn owner_reports_piece_colour() {
        let rules = ChessRules::new();

        assert_eq!(rules.owner("e2"), Some(Side::White));
        assert_eq!(rules.owner("d8"), Some(Side::Black));
        assert_eq!(rules.owner("e4"), None);
    }

    #[test]
    fn reset_returns_to_the_start() {
        let mut rules = ChessRules::new();

        play_all(&mut rules, &["d2d4"]);
        rules.reset();
        assert!(rules.history().is_empty());
        assert_eq!(rules.side_to_move(), Side::White);
        assert_eq!(rules.record(), "*");
    }

    #[test]
    fn record_starting_with_black() {
        let mut rules =
            ChessRules::from_fen("4k3/8/8/8/8/8/4P3/4K3 b - - 0 10").unwrap();

        play_all(&mut rules, &["e8d8", "e2e4"]);
        assert_eq!(rules.record(), "10... Kd8 11. e4 *");
    }

    #[test]
    fn side_parses_from_text() {
        assert_eq!("white".parse::<Side>(), Ok(Side::White));
        assert_eq!("b".parse::<Side>(), Ok(Side::Black));
        assert!("red".parse::<Side>().is_err());
        assert_eq!(Side::White.opponent(), Side::Black);
    }
}
