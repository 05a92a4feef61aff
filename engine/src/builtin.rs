//! Engines which ship with the crate.
//!
//! `builtin:random` answers the protocol subset the controller speaks and
//! plays a uniformly random legal move on every `go`. It is useful for trying
//! out a front-end without an engine artifact, and as a live counterpart in
//! tests.

use crate::host::{EngineProgram, HostIo, LoadError, Loader};
use crate::uci::{Command, LineBuffer, Parser};

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Position};

use std::io::{self, Write};

pub const RANDOM: &str = "builtin:random";

const NAME: &str = "Random Mover";

/// Resolves the `builtin:` locations.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinLoader;

impl Loader for BuiltinLoader {
    fn load(&self, location: &str) -> Result<Box<dyn EngineProgram>, LoadError> {
        match location {
            RANDOM => Ok(Box::new(RandomMover::new())),
            _ => Err(LoadError::UnknownLocation(location.to_string())),
        }
    }
}

pub struct RandomMover {
    rng: StdRng,
    pos: Chess,
}

impl RandomMover {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            pos: Chess::default(),
        }
    }

    /// A mover whose choices are reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            pos: Chess::default(),
        }
    }

    fn serve(&mut self, io: &mut HostIo) -> io::Result<()> {
        let mut lines = LineBuffer::new();

        loop {
            let text = io.stdin.blocking_read()?;

            for line in lines.push(&text) {
                match Parser::parse(&line) {
                    Ok(Command::Uci) => {
                        writeln!(io.stdout, "id name {}", NAME)?;
                        writeln!(io.stdout, "id author webuci")?;
                        writeln!(io.stdout, "uciok")?;
                    }
                    Ok(Command::IsReady) => writeln!(io.stdout, "readyok")?,
                    Ok(Command::UciNewGame) => self.pos = Chess::default(),
                    Ok(Command::Position { fen, moves }) => {
                        if let Err(reason) = self.set_position(fen.as_deref(), &moves) {
                            writeln!(io.stderr, "{}", reason)?;
                        }
                    }
                    Ok(Command::Go { .. }) => self.go(io)?,
                    Ok(Command::Stop) => {}
                    Ok(Command::Quit) => return Ok(()),
                    Err(err) => writeln!(io.stderr, "{}: {}", err, line)?,
                }
            }
        }
    }

    fn set_position(&mut self, fen: Option<&str>, moves: &[String]) -> Result<(), String> {
        let mut pos = match fen {
            None => Chess::default(),
            Some(fen) => fen
                .parse::<Fen>()
                .map_err(|_| format!("bad fen: {}", fen))?
                .into_position(CastlingMode::Standard)
                .map_err(|_| format!("bad position: {}", fen))?,
        };

        for mv in moves {
            let m = mv
                .parse::<UciMove>()
                .ok()
                .and_then(|uci| uci.to_move(&pos).ok())
                .ok_or_else(|| format!("illegal move: {}", mv))?;
            pos.play_unchecked(&m);
        }

        self.pos = pos;
        Ok(())
    }

    fn go(&mut self, io: &mut HostIo) -> io::Result<()> {
        let moves = self.pos.legal_moves();

        match moves.choose(&mut self.rng) {
            Some(m) => {
                writeln!(io.stdout, "info depth 1 score cp 0 nodes {}", moves.len())?;
                writeln!(io.stdout, "bestmove {}", m.to_uci(CastlingMode::Standard))
            }
            None => writeln!(io.stdout, "bestmove 0000"),
        }
    }
}

impl Default for RandomMover {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineProgram for RandomMover {
    fn run(mut self: Box<Self>, mut io: HostIo) -> i32 {
        if let Err(err) = self.serve(&mut io) {
            debug!("random mover stopped: {}", err);
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{self, Inbox, Kind, SessionId};
    use crate::host::{Emitter, Stdin};
    use crate::rules::{ChessRules, Rules, Side};
    use crate::session::Session;
    use crate::uci::{parse_line, Event};

    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// Collect stdout lines until one starting with `prefix` arrives.
    fn read_until(inbox: &Inbox, prefix: &str) -> Vec<String> {
        let mut buf = LineBuffer::new();
        let mut seen = Vec::new();

        loop {
            let env = inbox.recv_timeout(Duration::from_secs(5)).unwrap();
            if env.message.kind != Kind::Stdout {
                continue;
            }
            for line in buf.push(&env.message.content) {
                let done = line.starts_with(prefix);
                seen.push(line);
                if done {
                    return seen;
                }
            }
        }
    }

    #[test]
    fn unknown_builtin_is_refused() {
        assert!(matches!(
            BuiltinLoader.load("builtin:stockfish"),
            Err(LoadError::UnknownLocation(_))
        ));
    }

    #[test]
    fn answers_handshake_and_plays_a_legal_reply() {
        let (outbox, inbox) = comm::channel();
        let mut session =
            Session::create(SessionId(1), RANDOM, 256, Arc::new(BuiltinLoader), outbox).unwrap();

        session.send("uci\nisready\n").unwrap();
        let handshake = read_until(&inbox, "readyok");
        assert_eq!(
            parse_line(&handshake[0], Side::Black),
            Some(Event::Identified(NAME.to_string()))
        );
        assert!(handshake.contains(&"uciok".to_string()));

        session
            .send("position startpos moves e2e4\ngo movetime 10\n")
            .unwrap();
        let search = read_until(&inbox, "bestmove");
        assert!(search[0].starts_with("info depth 1 score cp 0 nodes 20"));

        let reply = match parse_line(search.last().unwrap(), Side::Black) {
            Some(Event::BestMove(mv)) => mv,
            other => panic!("expected a best move, got {:?}", other),
        };
        let mut rules = ChessRules::new();
        rules.play("e2e4").unwrap();
        assert!(rules.play(&reply).is_ok(), "{} is not legal", reply);

        assert_eq!(session.teardown(), Some(0));
    }

    #[test]
    fn no_legal_moves_is_a_null_move() {
        let (outbox, inbox) = comm::channel();
        let (mut tx, rx) = mailbox::channel(256);
        let io = HostIo {
            stdin: Stdin::new(rx),
            stdout: Emitter::new(SessionId(1), Kind::Stdout, outbox.clone()),
            stderr: Emitter::new(SessionId(1), Kind::Debug, outbox),
        };

        let engine = thread::spawn(move || Box::new(RandomMover::seeded(7)).run(io));

        tx.send(b"position fen 7k/5Q2/6K1/8/8/8/8/8 b - - 0 1\ngo\n")
            .unwrap();
        assert_eq!(read_until(&inbox, "bestmove"), ["bestmove 0000"]);

        tx.send(b"quit\n").unwrap();
        assert_eq!(engine.join().unwrap(), 0);
    }

    #[test]
    fn bad_commands_are_reported_on_stderr() {
        let (outbox, inbox) = comm::channel();
        let (mut tx, rx) = mailbox::channel(256);
        let io = HostIo {
            stdin: Stdin::new(rx),
            stdout: Emitter::new(SessionId(1), Kind::Stdout, outbox.clone()),
            stderr: Emitter::new(SessionId(1), Kind::Debug, outbox),
        };

        let engine = thread::spawn(move || Box::new(RandomMover::seeded(1)).run(io));

        tx.send(b"position startpos moves e2e5\n").unwrap();
        drop(tx);
        assert_eq!(engine.join().unwrap(), 0);

        let diagnostics: String = inbox
            .try_iter()
            .filter(|env| env.message.kind == Kind::Debug)
            .map(|env| env.message.content)
            .collect();
        assert_eq!(diagnostics, "illegal move: e2e5\n");
    }
}
