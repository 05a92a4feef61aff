//! The engine host adapter.
//!
//! Engines are written as classic command-line programs: they block reading
//! commands from standard input and write text to standard output and error.
//! The host runs such a program on its own thread and stands in for all three
//! streams:
//!
//! - `Stdin` is backed by the receiving half of the session mailbox.
//! - `Emitter`s for stdout and stderr forward every write, verbatim and in
//!   order, to the controller's `Outbox`.
//!
//! The host does not interpret the protocol. If the program cannot be loaded,
//! panics or returns, the controller is told with an `alert`.

use crate::comm::{Envelope, HostMessage, Kind, Outbox, SessionId};

use log::{debug, error, info};

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Exit code reported when the engine could not be loaded.
pub const LOAD_FAILED: i32 = -1;
/// Exit code reported when the engine panicked.
pub const CRASHED: i32 = -2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostError {
    /// The session was torn down. No more input will ever arrive and nobody is
    /// listening to output.
    Closed,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine session closed")
    }
}

impl std::error::Error for HostError {}

impl From<HostError> for io::Error {
    fn from(err: HostError) -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, err)
    }
}

/// The engine's standard input.
pub struct Stdin {
    commands: mailbox::Receiver,
    /// Set after a message has been handed out, so that the next read reports
    /// "nothing more for now" once before blocking again.
    end_of_input: bool,
}

impl Stdin {
    pub fn new(commands: mailbox::Receiver) -> Self {
        Self {
            commands,
            end_of_input: false,
        }
    }

    /// Block until the next command message arrives and return it as text.
    ///
    /// After each message, the following call returns an empty string
    /// immediately (unless another message is already waiting), telling the
    /// engine that the input received so far is complete. Returns
    /// `HostError::Closed` once the session has been torn down.
    pub fn blocking_read(&mut self) -> Result<String, HostError> {
        if self.end_of_input && !self.commands.is_pending() {
            self.end_of_input = false;
            return Ok(String::new());
        }

        let bytes = self.commands.recv().map_err(|_| HostError::Closed)?;
        self.end_of_input = true;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// True once the session has been torn down and no input is left.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed() && !self.commands.is_pending()
    }
}

/// Forwards text written by the engine to the controller. Never blocks.
#[derive(Clone)]
pub struct Emitter {
    session: SessionId,
    kind: Kind,
    outbox: Outbox,
    /// Bytes of a UTF-8 sequence cut short by the end of the last write.
    partial: Vec<u8>,
}

impl Emitter {
    pub fn new(session: SessionId, kind: Kind, outbox: Outbox) -> Self {
        Self {
            session,
            kind,
            outbox,
            partial: Vec::new(),
        }
    }

    pub fn emit(&self, text: &str) -> Result<(), HostError> {
        let envelope = Envelope {
            session: self.session,
            message: HostMessage {
                kind: self.kind,
                content: text.to_string(),
            },
        };

        self.outbox.send(envelope).map_err(|_| HostError::Closed)
    }
}

impl io::Write for Emitter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(buf);

        // Hold back an incomplete sequence at the end until the next write
        // completes it. Bytes that can never become valid go out replaced.
        let complete = match std::str::from_utf8(&self.partial) {
            Ok(_) => self.partial.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(_) => self.partial.len(),
        };

        if complete > 0 {
            let bytes: Vec<u8> = self.partial.drain(..complete).collect();
            if let Err(err) = self.emit(&String::from_utf8_lossy(&bytes)) {
                self.partial.clear();
                return Err(err.into());
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The standard streams handed to an engine program.
pub struct HostIo {
    pub stdin: Stdin,
    pub stdout: Emitter,
    pub stderr: Emitter,
}

impl HostIo {
    pub fn emit_output(&self, text: &str) -> Result<(), HostError> {
        self.stdout.emit(text)
    }

    pub fn emit_diagnostic(&self, text: &str) -> Result<(), HostError> {
        self.stderr.emit(text)
    }
}

/// A loaded engine, ready to run on the hosting thread. Returns its exit code.
pub trait EngineProgram: Send {
    fn run(self: Box<Self>, io: HostIo) -> i32;
}

impl<F> EngineProgram for F
where
    F: FnOnce(HostIo) -> i32 + Send,
{
    fn run(self: Box<Self>, io: HostIo) -> i32 {
        (*self)(io)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// Nothing is known at this location.
    UnknownLocation(String),
    /// The artifact exists but could not be turned into a runnable engine.
    Failed { location: String, reason: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnknownLocation(location) => write!(f, "no engine at `{}`", location),
            LoadError::Failed { location, reason } => {
                write!(f, "could not load `{}`: {}", location, reason)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Resolves an engine artifact location to a runnable program.
pub trait Loader: Send + Sync {
    fn load(&self, location: &str) -> Result<Box<dyn EngineProgram>, LoadError>;
}

/// Body of an engine-hosting thread: load the program at `location`, run it
/// against the mailbox and outbox, and report how it ended.
pub(crate) fn run(
    session: SessionId,
    location: String,
    loader: Arc<dyn Loader>,
    commands: mailbox::Receiver,
    outbox: Outbox,
) -> i32 {
    let stdout = Emitter::new(session, Kind::Stdout, outbox.clone());
    let stderr = Emitter::new(session, Kind::Debug, outbox.clone());
    let alerts = Emitter::new(session, Kind::Alert, outbox);

    let program = match loader.load(&location) {
        Ok(program) => program,
        Err(err) => {
            error!("session {}: {}", session, err);
            let _ = alerts.emit(&err.to_string());
            return LOAD_FAILED;
        }
    };

    info!("session {}: running engine from `{}`", session, location);

    let io = HostIo {
        stdin: Stdin::new(commands),
        stdout,
        stderr: stderr.clone(),
    };

    let code = match panic::catch_unwind(AssertUnwindSafe(move || program.run(io))) {
        Ok(code) => code,
        Err(_) => {
            error!("session {}: engine panicked", session);
            let _ = alerts.emit("engine crashed");
            return CRASHED;
        }
    };

    debug!("session {}: engine exited with code {}", session, code);
    let _ = stderr.emit(&format!("(webuci): engine exited with exit code {}\n", code));
    let _ = alerts.emit(&format!("engine exited with exit code {}", code));

    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm;
    use std::io::Write;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn each_message_is_followed_by_one_empty_read() {
        let (mut tx, rx) = mailbox::channel(64);
        let mut stdin = Stdin::new(rx);

        tx.send(b"uci\nisready\n").unwrap();
        assert_eq!(stdin.blocking_read().unwrap(), "uci\nisready\n");
        assert_eq!(stdin.blocking_read().unwrap(), "");

        tx.send(b"ucinewgame\n").unwrap();
        assert_eq!(stdin.blocking_read().unwrap(), "ucinewgame\n");
        assert_eq!(stdin.blocking_read().unwrap(), "");
    }

    #[test]
    fn pending_message_skips_the_empty_read() {
        let (mut tx, rx) = mailbox::channel(64);
        let mut stdin = Stdin::new(rx);

        tx.send(b"uci\n").unwrap();
        assert_eq!(stdin.blocking_read().unwrap(), "uci\n");

        tx.send(b"isready\n").unwrap();
        assert_eq!(stdin.blocking_read().unwrap(), "isready\n");
    }

    #[test]
    fn read_after_empty_blocks_for_next_message() {
        let (mut tx, rx) = mailbox::channel(64);
        let mut stdin = Stdin::new(rx);

        tx.send(b"uci\n").unwrap();
        stdin.blocking_read().unwrap();
        stdin.blocking_read().unwrap();

        let reader = thread::spawn(move || stdin.blocking_read());
        thread::sleep(Duration::from_millis(50));
        tx.send(b"go\n").unwrap();

        assert_eq!(reader.join().unwrap(), Ok("go\n".to_string()));
    }

    #[test]
    fn torn_down_session_closes_stdin() {
        let (tx, rx) = mailbox::channel(64);
        let mut stdin = Stdin::new(rx);

        drop(tx);
        assert!(stdin.is_closed());
        assert_eq!(stdin.blocking_read(), Err(HostError::Closed));
    }

    #[test]
    fn writes_are_forwarded_in_order() {
        let (outbox, inbox) = comm::channel();
        let mut out = Emitter::new(SessionId(3), Kind::Stdout, outbox);

        write!(out, "bestm").unwrap();
        writeln!(out, "ove e2e4").unwrap();

        let chunks: String = inbox
            .try_iter()
            .map(|env| {
                assert_eq!(env.session, SessionId(3));
                assert_eq!(env.message.kind, Kind::Stdout);
                env.message.content
            })
            .collect();
        assert_eq!(chunks, "bestmove e2e4\n");
    }

    #[test]
    fn character_split_across_writes_arrives_whole() {
        let (outbox, inbox) = comm::channel();
        let mut out = Emitter::new(SessionId(2), Kind::Stdout, outbox);

        // The second byte of `é` starts the second write.
        let line = "id name Café\n".as_bytes();
        out.write_all(&line[..12]).unwrap();
        out.write_all(&line[12..]).unwrap();

        let chunks: Vec<_> = inbox.try_iter().map(|env| env.message.content).collect();
        assert_eq!(chunks, ["id name Caf", "é\n"]);
    }

    #[test]
    fn invalid_bytes_are_not_held_back() {
        let (outbox, inbox) = comm::channel();
        let mut out = Emitter::new(SessionId(2), Kind::Debug, outbox);

        out.write_all(b"bad \xff byte\n").unwrap();
        assert_eq!(inbox.try_recv().unwrap().message.content, "bad \u{fffd} byte\n");
    }

    #[test]
    fn output_and_diagnostics_use_their_own_streams() {
        let (outbox, inbox) = comm::channel();
        let (_tx, rx) = mailbox::channel(8);
        let io = HostIo {
            stdin: Stdin::new(rx),
            stdout: Emitter::new(SessionId(5), Kind::Stdout, outbox.clone()),
            stderr: Emitter::new(SessionId(5), Kind::Debug, outbox),
        };

        io.emit_diagnostic("warming up\n").unwrap();
        io.emit_output("readyok\n").unwrap();

        let messages: Vec<_> = inbox.try_iter().map(|env| env.message).collect();
        assert_eq!(
            messages,
            [HostMessage::debug("warming up\n"), HostMessage::stdout("readyok\n")]
        );
    }

    #[test]
    fn write_fails_once_controller_is_gone() {
        let (outbox, inbox) = comm::channel();
        let mut out = Emitter::new(SessionId(1), Kind::Debug, outbox);

        drop(inbox);
        assert!(out.write_all(b"hello").is_err());
    }

    struct Refuse;

    impl Loader for Refuse {
        fn load(&self, location: &str) -> Result<Box<dyn EngineProgram>, LoadError> {
            Err(LoadError::UnknownLocation(location.to_string()))
        }
    }

    #[test]
    fn load_failure_is_an_alert() {
        let (outbox, inbox) = comm::channel();
        let (_tx, rx) = mailbox::channel(64);

        let code = run(SessionId(1), "nowhere".into(), Arc::new(Refuse), rx, outbox);

        assert_eq!(code, LOAD_FAILED);
        let env = inbox.try_recv().unwrap();
        assert_eq!(env.message, HostMessage::alert("no engine at `nowhere`"));
    }

    struct Panicky;

    impl Loader for Panicky {
        fn load(&self, _: &str) -> Result<Box<dyn EngineProgram>, LoadError> {
            Ok(Box::new(|_io: HostIo| -> i32 { panic!("engine bug") }))
        }
    }

    #[test]
    fn panic_is_an_alert() {
        let (outbox, inbox) = comm::channel();
        let (_tx, rx) = mailbox::channel(64);

        let code = run(SessionId(2), "bug".into(), Arc::new(Panicky), rx, outbox);

        assert_eq!(code, CRASHED);
        let last = inbox.try_iter().last().unwrap();
        assert_eq!(last.message, HostMessage::alert("engine crashed"));
    }
}
