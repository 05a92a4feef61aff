//! The turn controller.
//!
//! The `Controller` owns the game-turn state machine. It creates and tears
//! down engine sessions, sends protocol commands through the session mailbox,
//! and consumes the messages engine-hosting threads post to its inbox. The
//! game itself lives in a [`Rules`] collaborator and everything the user sees
//! goes to a [`Frontend`].
//!
//! The controller never blocks waiting for the engine. The owner drives it by
//! calling [`Controller::pump`], or by receiving from [`Controller::inbox`]
//! itself and passing each envelope to [`Controller::handle`].
//!
//! Every `ucinewgame` is followed by `isready`, and no search is sent while
//! any `isready` is unanswered.
//!
//! Stale engine output is dropped at three levels:
//! - envelopes from any session other than the current one,
//! - best moves answering a search which a restart abandoned,
//! - best moves arriving when it is not the engine's turn to move.


use crate::comm::{self, Envelope, Inbox, Kind, Outbox, SessionId};
use crate::frontend::Frontend;
use crate::host::Loader;
use crate::options::Config;
use crate::rules::{Rules, RulesError, Side};
use crate::session::{Session, SessionError};
use crate::uci::{self, parse_line, Command, Event, LineBuffer};

use log::{debug, error, info, trace, warn};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The engine's display name until it identifies itself.
pub const PLACEHOLDER_NAME: &str = "engine";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// No session.
    Idle,
    /// A session exists but no game has been set up on it yet.
    AwaitingIdentification,
    HumanToMove,
    EngineThinking,
    /// Terminal for the current game. Only a restart begins a new one.
    GameOver,
    /// A fault ended the session. Only a restart recovers.
    Halted,
}

#[derive(Debug)]
pub enum Error {
    /// There is no game to play a move in.
    NoSession,
    NotHumansTurn,
    GameOver,
    /// The rules collaborator refused the move. Nothing changed.
    Rules(RulesError),
    /// The session failed and the controller is now halted.
    Session(SessionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoSession => write!(f, "no game in progress"),
            Error::NotHumansTurn => write!(f, "not your turn"),
            Error::GameOver => write!(f, "the game is over"),
            Error::Rules(err) => write!(f, "{}", err),
            Error::Session(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<RulesError> for Error {
    fn from(err: RulesError) -> Self {
        Error::Rules(err)
    }
}

impl From<SessionError> for Error {
    fn from(err: SessionError) -> Self {
        Error::Session(err)
    }
}

pub struct Controller<R: Rules, F: Frontend> {
    config: Config,
    loader: Arc<dyn Loader>,
    rules: R,
    frontend: F,
    /// Cloned into every session's host thread.
    outbox: Outbox,
    inbox: Inbox,
    session: Option<Session>,
    next_session: u64,
    /// Unterminated engine output of the current session.
    lines: LineBuffer,
    state: State,
    human: Side,
    engine_name: String,
    /// `isready` commands sent to the current session and not yet answered.
    /// The session is ready when this is zero.
    unanswered: u32,
    /// A search was requested before the session was ready.
    deferred: bool,
    /// A search command was sent and its best move has not arrived yet.
    searching: bool,
    /// Searches abandoned by a restart whose best moves are still to come.
    stale: u32,
}

impl<R: Rules, F: Frontend> Controller<R, F> {
    pub fn new(config: Config, rules: R, frontend: F, loader: Arc<dyn Loader>) -> Self {
        let (outbox, inbox) = comm::channel();
        let human = config.human;

        Self {
            config,
            loader,
            rules,
            frontend,
            outbox,
            inbox,
            session: None,
            next_session: 1,
            lines: LineBuffer::new(),
            state: State::Idle,
            human,
            engine_name: PLACEHOLDER_NAME.to_string(),
            unanswered: 0,
            deferred: false,
            searching: false,
            stale: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// True from dispatching a search until its best move is applied.
    pub fn thinking(&self) -> bool {
        self.state == State::EngineThinking
    }

    pub fn human_side(&self) -> Side {
        self.human
    }

    pub fn engine_side(&self) -> Side {
        self.human.opponent()
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn engine_location(&self) -> &str {
        &self.config.engine
    }

    pub fn movetime(&self) -> u32 {
        self.config.movetime
    }

    pub fn set_movetime(&mut self, movetime: u32) {
        self.config.movetime = movetime;
    }

    /// True once the session has answered every `isready` sent to it.
    pub fn is_ready(&self) -> bool {
        self.session.is_some() && self.unanswered == 0
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(Session::id)
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    /// A handle on the inbox, for owners which multiplex it with other input.
    /// Every envelope received from it must be passed to [`Controller::handle`].
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    /// Begin a game with the configured human side.
    pub fn start(&mut self) -> Result<(), Error> {
        self.restart(self.config.human)
    }

    /// Start a new game with the human playing `human`. A session is created
    /// if there is none; otherwise the current engine is reused.
    pub fn restart(&mut self, human: Side) -> Result<(), Error> {
        if self.session.is_none() {
            self.open_session()?;
        }

        let mut commands = vec![];
        if self.searching {
            self.stale += 1;
            self.searching = false;
            commands.push(Command::Stop);
        }
        commands.push(Command::UciNewGame);
        commands.push(Command::IsReady);
        self.deferred = false;

        info!("new game, human plays {}", human);
        self.human = human;
        self.rules.reset();
        self.frontend.clear_markers();
        self.frontend.set_orientation(human);

        self.send(&commands)?;
        self.after_move()
    }

    /// Play a move for the human, in compact coordinate notation.
    pub fn submit_move(&mut self, mv: &str) -> Result<(), Error> {
        match self.state {
            State::HumanToMove => {}
            State::EngineThinking => return Err(Error::NotHumansTurn),
            State::GameOver => return Err(Error::GameOver),
            State::Idle | State::AwaitingIdentification | State::Halted => {
                return Err(Error::NoSession)
            }
        }

        self.rules.play(mv)?;
        info!("human plays {}", mv);

        self.after_move()
    }

    /// The human picked up the piece on `square`. Marks every legal
    /// destination and returns true, or returns false if the piece may not be
    /// moved now.
    pub fn drag_start(&mut self, square: &str) -> bool {
        if self.state != State::HumanToMove || self.rules.owner(square) != Some(self.human) {
            return false;
        }

        self.frontend.clear_markers();
        for target in self.rules.legal_targets(square) {
            self.frontend.add_marker(&target);
        }

        true
    }

    /// The human dropped a piece from `from` onto `to`. Pawns reaching the
    /// last rank become queens. A refused move changes nothing.
    pub fn drop_piece(&mut self, from: &str, to: &str) -> Result<(), Error> {
        self.frontend.clear_markers();

        let mv = format!("{}{}", from, to);
        match self.submit_move(&mv) {
            Err(Error::Rules(RulesError::Illegal(_))) => {
                let promotion = format!("{}q", mv);
                self.submit_move(&promotion)
                    .map_err(|_| Error::Rules(RulesError::Illegal(mv)))
            }
            result => result,
        }
    }

    /// Replace the engine with the one at `location`. The game continues; a
    /// search in flight is sent again to the new engine once it is ready.
    pub fn swap_engine(&mut self, location: &str) -> Result<(), Error> {
        let was_thinking = self.state == State::EngineThinking;

        info!("swapping engine to `{}`", location);
        self.config.engine = location.to_string();
        self.open_session()?;

        if matches!(
            self.state,
            State::HumanToMove | State::EngineThinking | State::GameOver
        ) {
            self.send(&[Command::UciNewGame, Command::IsReady])?;
        }

        if was_thinking {
            self.dispatch_search()?;
        }

        Ok(())
    }

    /// The game so far as PGN movetext.
    pub fn export_record(&self) -> String {
        self.rules.record()
    }

    /// Wait up to `timeout` for engine output and handle everything that has
    /// arrived. Returns the number of envelopes handled.
    pub fn pump(&mut self, timeout: Duration) -> usize {
        let first = match self.inbox.recv_timeout(timeout) {
            Ok(envelope) => envelope,
            Err(_) => return 0,
        };

        self.handle(first);
        let mut handled = 1;

        while let Ok(envelope) = self.inbox.try_recv() {
            self.handle(envelope);
            handled += 1;
        }

        handled
    }

    /// Handle one message from an engine-hosting thread.
    pub fn handle(&mut self, envelope: Envelope) {
        if self.session_id() != Some(envelope.session) {
            trace!("dropping message from stale session {}", envelope.session);
            return;
        }

        let content = envelope.message.content;
        match envelope.message.kind {
            Kind::Stdout => {
                self.frontend.debug(&content);
                for line in self.lines.push(&content) {
                    self.handle_line(&line);
                }
            }
            Kind::Debug => self.frontend.debug(&content),
            Kind::Alert => self.halt(&content),
        }
    }

    /// Ask the engine to quit and wait for it. The controller returns to
    /// `Idle`.
    pub fn shutdown(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Err(err) = session.send(&uci::message(&[Command::Quit])) {
                debug!("session {}: quit not delivered: {}", session.id(), err);
            }
        }

        self.close_session();
        self.set_state(State::Idle);
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            debug!("state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Replace the current session, if any, with a fresh one for the
    /// configured engine and send it the handshake.
    fn open_session(&mut self) -> Result<(), Error> {
        self.close_session();

        let id = SessionId(self.next_session);
        self.next_session += 1;

        self.lines.clear();
        self.engine_name = PLACEHOLDER_NAME.to_string();
        self.unanswered = 0;
        self.deferred = false;
        self.searching = false;
        self.stale = 0;

        let session = match Session::create(
            id,
            &self.config.engine,
            self.config.mailbox_capacity,
            Arc::clone(&self.loader),
            self.outbox.clone(),
        ) {
            Ok(session) => session,
            Err(err) => {
                self.halt(&err.to_string());
                return Err(Error::Session(err));
            }
        };
        self.session = Some(session);

        if matches!(self.state, State::Idle | State::Halted) {
            self.set_state(State::AwaitingIdentification);
        }

        self.send(&[Command::Uci, Command::IsReady])
    }

    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            let id = session.id();
            match session.teardown() {
                Some(code) => debug!("session {} closed, exit code {}", id, code),
                None => warn!("session {} closed abnormally", id),
            }
        }
    }

    /// Write `commands` to the engine as one message. Any failure halts the
    /// controller.
    fn send(&mut self, commands: &[Command]) -> Result<(), Error> {
        let text = uci::message(commands);
        let session = self.session.as_mut().ok_or(Error::NoSession)?;
        let id = session.id();

        let readiness = commands
            .iter()
            .filter(|command| matches!(command, Command::IsReady))
            .count() as u32;

        if let Err(err) = session.send(&text) {
            self.close_session();

            // The host explains why its engine stopped reading.
            let reason = match &err {
                SessionError::Dead => self.host_alert(id),
                _ => None,
            };
            self.halt(&reason.unwrap_or_else(|| err.to_string()));

            return Err(Error::Session(err));
        }

        self.unanswered += readiness;
        Ok(())
    }

    /// The last alert posted by the finished session `id`. Everything else
    /// waiting in the inbox belongs to dead sessions and is discarded.
    fn host_alert(&self, id: SessionId) -> Option<String> {
        self.inbox
            .try_iter()
            .filter(|env| env.session == id && env.message.kind == Kind::Alert)
            .map(|env| env.message.content)
            .last()
    }

    fn halt(&mut self, reason: &str) {
        error!("halted: {}", reason);

        self.close_session();
        self.unanswered = 0;
        self.deferred = false;
        self.searching = false;
        self.stale = 0;

        self.set_state(State::Halted);
        self.frontend.alert(reason);
    }

    /// Show the position and decide who moves next.
    fn after_move(&mut self) -> Result<(), Error> {
        self.frontend.set_position(&self.rules.fen());

        if let Some(outcome) = self.rules.outcome() {
            info!("game over: {}", outcome);
            self.set_state(State::GameOver);
            self.frontend.game_over(outcome);
            return Ok(());
        }

        if self.rules.side_to_move() == self.human {
            self.set_state(State::HumanToMove);
            Ok(())
        } else {
            self.set_state(State::EngineThinking);
            self.dispatch_search()
        }
    }

    /// Send the full game and a search budget, or hold the search until the
    /// session is ready.
    fn dispatch_search(&mut self) -> Result<(), Error> {
        if !self.is_ready() {
            debug!("engine not ready, search deferred");
            self.deferred = true;
            return Ok(());
        }

        self.deferred = false;
        let commands = [
            Command::Position {
                fen: self.rules.initial_fen(),
                moves: self.rules.history().to_vec(),
            },
            Command::Go {
                movetime: Some(self.config.movetime),
                depth: None,
            },
        ];

        self.send(&commands)?;
        self.searching = true;
        Ok(())
    }

    fn handle_line(&mut self, line: &str) {
        let event = match parse_line(line, self.engine_side()) {
            Some(event) => event,
            None => {
                trace!("engine: {}", line);
                return;
            }
        };

        match event {
            Event::Identified(name) => {
                info!("engine identified as {}", name);
                self.engine_name = name;
                self.frontend.engine_identified(&self.engine_name);
            }
            Event::HandshakeDone => debug!("handshake done"),
            Event::Ready => self.on_ready(),
            Event::Telemetry(telemetry) => {
                if self.searching && self.stale == 0 {
                    self.frontend.telemetry(&telemetry);
                } else {
                    trace!("dropping telemetry from an abandoned search");
                }
            }
            Event::BestMove(mv) => self.on_best_move(&mv),
        }
    }

    fn on_ready(&mut self) {
        if self.unanswered == 0 {
            trace!("unsolicited readyok");
            return;
        }

        self.unanswered -= 1;
        if self.unanswered > 0 {
            debug!("readyok, {} more to come", self.unanswered);
            return;
        }

        debug!("engine ready");

        if self.deferred && self.state == State::EngineThinking {
            if let Err(err) = self.dispatch_search() {
                debug!("deferred search failed: {}", err);
            }
        }
        self.deferred = false;
    }

    fn on_best_move(&mut self, mv: &str) {
        if self.stale > 0 {
            self.stale -= 1;
            debug!("dropping best move {} from an abandoned search", mv);
            return;
        }

        if self.state != State::EngineThinking
            || !self.searching
            || self.rules.side_to_move() == self.human
        {
            debug!("dropping out-of-turn best move {}", mv);
            return;
        }

        self.searching = false;
        if let Err(err) = self.rules.play(mv) {
            warn!("engine move refused: {}", err);
            return;
        }

        info!("engine plays {}", mv);
        if let Err(err) = self.after_move() {
            debug!("search dispatch failed: {}", err);
        }
    }
}
