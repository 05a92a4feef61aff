//! Parsing of commands received by an engine.
use super::Command;

use std::fmt;

/// The reserved keywords which can be sent from the controller to an engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Keyword {
    Uci,
    IsReady,
    UciNewGame,
    Position,
    Fen,
    Startpos,
    Moves,
    Go,
    MoveTime,
    Depth,
    Infinite,
    Stop,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token<'a> {
    Kw(Keyword),
    String(&'a str),
}

impl<'a> Token<'a> {
    fn scan(t: &'a str) -> Token<'a> {
        match t {
            "uci" => Token::Kw(Keyword::Uci),
            "isready" => Token::Kw(Keyword::IsReady),
            "ucinewgame" => Token::Kw(Keyword::UciNewGame),
            "position" => Token::Kw(Keyword::Position),
            "fen" => Token::Kw(Keyword::Fen),
            "startpos" => Token::Kw(Keyword::Startpos),
            "moves" => Token::Kw(Keyword::Moves),
            "go" => Token::Kw(Keyword::Go),
            "movetime" => Token::Kw(Keyword::MoveTime),
            "depth" => Token::Kw(Keyword::Depth),
            "infinite" => Token::Kw(Keyword::Infinite),
            "stop" => Token::Kw(Keyword::Stop),
            "quit" => Token::Kw(Keyword::Quit),
            _ => Token::String(t),
        }
    }
}

/// A parsing error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// There were no tokens to parse in the input line.
    NoInput,
    /// The first token is not a command this parser knows.
    UnknownCommand(String),
    /// Unexpected additional tokens were found after an otherwise valid command.
    ExpectedEnd,
    /// Expected a number value.
    ExpectedNumber,
    /// The input ended in the middle of a command.
    UnexpectedEnd,
    /// Unexpected token in input.
    UnexpectedToken,
    /// No position was given after the `position` keyword.
    NoPosition,
    /// A go command asked for a search limit which is not supported.
    UnsupportedTimeControl,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoInput => write!(f, "no input"),
            Error::UnknownCommand(cmd) => write!(f, "unknown command: {}", cmd),
            Error::ExpectedEnd => write!(f, "unexpected input after command"),
            Error::ExpectedNumber => write!(f, "expected a number"),
            Error::UnexpectedEnd => write!(f, "unexpected end of input"),
            Error::UnexpectedToken => write!(f, "unexpected token"),
            Error::NoPosition => write!(f, "no position given"),
            Error::UnsupportedTimeControl => write!(f, "unsupported time control"),
        }
    }
}

impl std::error::Error for Error {}

pub type PResult = Result<Command, Error>;

pub struct Parser<'a> {
    toks: Vec<Token<'a>>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    /// Parse one command line.
    pub fn parse(input: &'a str) -> PResult {
        Parser::new(input).parse_command()
    }

    fn new(input: &'a str) -> Parser<'a> {
        Parser {
            toks: input.split_whitespace().map(Token::scan).collect(),
            cursor: 0,
        }
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let next = self.toks.get(self.cursor).cloned();
        if next.is_some() {
            self.cursor += 1;
        }
        next
    }

    fn expect_end(&mut self, cmd: Command) -> PResult {
        if self.cursor == self.toks.len() {
            Ok(cmd)
        } else {
            Err(Error::ExpectedEnd)
        }
    }

    fn parse_integer(&mut self) -> Result<u32, Error> {
        match self.advance() {
            Some(Token::String(s)) => s.parse::<u32>().map_err(|_| Error::ExpectedNumber),
            Some(_) => Err(Error::ExpectedNumber),
            None => Err(Error::UnexpectedEnd),
        }
    }

    fn parse_command(&mut self) -> PResult {
        match self.advance() {
            Some(Token::Kw(Keyword::Uci)) => self.expect_end(Command::Uci),
            Some(Token::Kw(Keyword::IsReady)) => self.expect_end(Command::IsReady),
            Some(Token::Kw(Keyword::UciNewGame)) => self.expect_end(Command::UciNewGame),
            Some(Token::Kw(Keyword::Position)) => self.parse_position_and_moves(),
            Some(Token::Kw(Keyword::Go)) => self.parse_go(),
            Some(Token::Kw(Keyword::Stop)) => self.expect_end(Command::Stop),
            Some(Token::Kw(Keyword::Quit)) => self.expect_end(Command::Quit),
            Some(Token::String(s)) => Err(Error::UnknownCommand(s.to_string())),
            Some(Token::Kw(_)) => Err(Error::UnexpectedToken),
            None => Err(Error::NoInput),
        }
    }

    fn parse_position_and_moves(&mut self) -> PResult {
        let fen = self.parse_position()?;
        let moves = self.parse_moves()?;

        Ok(Command::Position { fen, moves })
    }

    fn parse_position(&mut self) -> Result<Option<String>, Error> {
        match self.advance() {
            Some(Token::Kw(Keyword::Startpos)) => Ok(None),
            Some(Token::Kw(Keyword::Fen)) => self.parse_fen().map(Some),
            Some(_) => Err(Error::UnexpectedToken),
            None => Err(Error::NoPosition),
        }
    }

    fn parse_fen(&mut self) -> Result<String, Error> {
        // A FEN string has 6 whitespace-separated fields.
        let mut fields = Vec::with_capacity(6);

        for _ in 0..6 {
            match self.advance() {
                Some(Token::String(field)) => fields.push(field),
                Some(_) => return Err(Error::UnexpectedToken),
                None => return Err(Error::NoPosition),
            }
        }

        Ok(fields.join(" "))
    }

    fn parse_moves(&mut self) -> Result<Vec<String>, Error> {
        match self.advance() {
            Some(Token::Kw(Keyword::Moves)) => self.parse_move_list(),
            Some(_) => Err(Error::UnexpectedToken),
            None => Ok(vec![]),
        }
    }

    fn parse_move_list(&mut self) -> Result<Vec<String>, Error> {
        let mut moves = Vec::new();

        while let Some(tok) = self.advance() {
            match tok {
                Token::String(mov) => moves.push(mov.to_string()),
                Token::Kw(_) => return Err(Error::UnexpectedToken),
            }
        }

        Ok(moves)
    }

    fn parse_go(&mut self) -> PResult {
        let mut movetime = None;
        let mut depth = None;

        while let Some(tok) = self.advance() {
            match tok {
                Token::Kw(Keyword::MoveTime) => movetime = Some(self.parse_integer()?),
                Token::Kw(Keyword::Depth) => depth = Some(self.parse_integer()?),
                // Searching "until stopped" is the same as no limit at all.
                Token::Kw(Keyword::Infinite) => {}
                _ => return Err(Error::UnsupportedTimeControl),
            }
        }

        Ok(Command::Go { movetime, depth })
    }
}
