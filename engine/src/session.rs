//! One engine session: a mailbox plus the thread hosting the engine.
//!
//! A session is never reused. Swapping engines tears the old session down
//! completely before the new one is created, so two hosting threads for the
//! same controller are never alive at once.

use crate::comm::{Outbox, SessionId};
use crate::host::{self, Loader};

use log::{debug, warn};
use mailbox::SendError;

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug)]
pub enum SessionError {
    /// The hosting thread could not be started.
    Spawn(io::Error),
    /// A mailbox must hold at least one byte and at most `u32::MAX` bytes.
    InvalidCapacity(usize),
    /// A command did not fit in the mailbox. Nothing was written.
    Capacity { len: usize, capacity: usize },
    /// Commands are never empty.
    EmptyCommand,
    /// The engine is no longer reading its input.
    Dead,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Spawn(err) => write!(f, "could not start engine thread: {}", err),
            SessionError::InvalidCapacity(capacity) => write!(
                f,
                "mailbox capacity must be between 1 and {} bytes, got {}",
                mailbox::MAX_CAPACITY,
                capacity
            ),
            SessionError::Capacity { len, capacity } => write!(
                f,
                "command of {} bytes exceeds the mailbox capacity of {} bytes",
                len, capacity
            ),
            SessionError::EmptyCommand => write!(f, "empty command"),
            SessionError::Dead => write!(f, "engine is not running"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<SendError> for SessionError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::Oversized { len, capacity } => SessionError::Capacity { len, capacity },
            SendError::Empty => SessionError::EmptyCommand,
            SendError::Disconnected => SessionError::Dead,
        }
    }
}

pub struct Session {
    id: SessionId,
    location: String,
    commands: mailbox::Sender,
    handle: Option<JoinHandle<i32>>,
}

impl Session {
    /// Start hosting the engine at `location`. Loading happens on the new
    /// thread; a failure to load is reported as an alert through `outbox`.
    pub fn create(
        id: SessionId,
        location: &str,
        capacity: usize,
        loader: Arc<dyn Loader>,
        outbox: Outbox,
    ) -> Result<Self, SessionError> {
        if capacity == 0 || capacity > mailbox::MAX_CAPACITY {
            return Err(SessionError::InvalidCapacity(capacity));
        }

        let (commands, inbox) = mailbox::channel(capacity);
        let thread_location = location.to_string();

        let handle = thread::Builder::new()
            .name(format!("engine-{}", id.0))
            .spawn(move || host::run(id, thread_location, loader, inbox, outbox))
            .map_err(SessionError::Spawn)?;

        debug!("session {}: created for `{}`", id, location);

        Ok(Self {
            id,
            location: location.to_string(),
            commands,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Deliver `text` to the engine as a single message. Blocks while the
    /// engine has not yet taken the previous message.
    pub fn send(&mut self, text: &str) -> Result<(), SessionError> {
        self.commands.send(text.as_bytes())?;
        debug!("session {}: >> {:?}", self.id, text);
        Ok(())
    }

    /// Close the engine's input and wait for its thread to finish. Returns the
    /// engine's exit code, or `None` if the thread panicked outside the engine.
    pub fn teardown(mut self) -> Option<i32> {
        self.join()
    }

    fn join(&mut self) -> Option<i32> {
        self.commands.close();

        let handle = self.handle.take()?;
        match handle.join() {
            Ok(code) => {
                debug!("session {}: torn down, exit code {}", self.id, code);
                Some(code)
            }
            Err(_) => {
                warn!("session {}: host thread panicked", self.id);
                None
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{self, HostMessage, Kind};
    use crate::host::{EngineProgram, HostIo, LoadError};

    /// Echoes every non-empty read to stdout and exits with the number of
    /// messages it saw.
    struct Echo;

    impl Loader for Echo {
        fn load(&self, location: &str) -> Result<Box<dyn EngineProgram>, LoadError> {
            if location != "echo" {
                return Err(LoadError::UnknownLocation(location.to_string()));
            }

            Ok(Box::new(|mut io: HostIo| -> i32 {
                let mut seen = 0;
                while let Ok(text) = io.stdin.blocking_read() {
                    if !text.is_empty() {
                        seen += 1;
                        let _ = io.emit_output(&text);
                    }
                }
                seen
            }))
        }
    }

    #[test]
    fn commands_reach_the_engine_and_output_comes_back() {
        let (outbox, inbox) = comm::channel();
        let mut session = Session::create(SessionId(1), "echo", 64, Arc::new(Echo), outbox).unwrap();

        session.send("uci\nisready\n").unwrap();
        session.send("quit\n").unwrap();
        assert_eq!(session.teardown(), Some(2));

        let stdout: Vec<_> = inbox
            .try_iter()
            .filter(|env| env.message.kind == Kind::Stdout)
            .map(|env| env.message.content)
            .collect();
        assert_eq!(stdout, ["uci\nisready\n", "quit\n"]);
    }

    #[test]
    fn exit_is_reported_as_debug_then_alert() {
        let (outbox, inbox) = comm::channel();
        let session = Session::create(SessionId(4), "echo", 64, Arc::new(Echo), outbox).unwrap();

        assert_eq!(session.teardown(), Some(0));

        let messages: Vec<_> = inbox.try_iter().collect();
        assert!(messages.iter().all(|env| env.session == SessionId(4)));
        assert_eq!(
            messages.iter().map(|env| env.message.clone()).collect::<Vec<_>>(),
            [
                HostMessage::debug("(webuci): engine exited with exit code 0\n"),
                HostMessage::alert("engine exited with exit code 0"),
            ]
        );
    }

    #[test]
    fn unknown_location_is_an_alert() {
        let (outbox, inbox) = comm::channel();
        let session = Session::create(SessionId(2), "nowhere", 64, Arc::new(Echo), outbox).unwrap();

        assert_eq!(session.location(), "nowhere");
        assert_eq!(session.teardown(), Some(host::LOAD_FAILED));
        assert_eq!(
            inbox.try_recv().unwrap().message,
            HostMessage::alert("no engine at `nowhere`")
        );
    }

    #[test]
    fn oversized_command_is_a_capacity_fault() {
        let (outbox, _inbox) = comm::channel();
        let mut session = Session::create(SessionId(3), "echo", 8, Arc::new(Echo), outbox).unwrap();

        match session.send("position startpos moves e2e4\n") {
            Err(SessionError::Capacity { len, capacity }) => {
                assert_eq!(len, 29);
                assert_eq!(capacity, 8);
            }
            other => panic!("expected a capacity fault, got {:?}", other),
        }

        // The session is still usable.
        session.send("uci\n").unwrap();
    }

    #[test]
    fn zero_capacity_is_refused_without_a_thread() {
        let (outbox, inbox) = comm::channel();

        match Session::create(SessionId(6), "echo", 0, Arc::new(Echo), outbox) {
            Err(SessionError::InvalidCapacity(0)) => {}
            Err(other) => panic!("expected an invalid capacity, got {:?}", other),
            Ok(_) => panic!("a session was created with capacity 0"),
        }

        // Nothing was hosted, so nothing reports an exit.
        assert!(inbox.try_recv().is_err());
    }

    #[test]
    fn send_after_engine_exit_is_dead() {
        let (outbox, inbox) = comm::channel();
        let mut session = Session::create(SessionId(5), "nowhere", 64, Arc::new(Echo), outbox).unwrap();

        // Wait for the load failure, after which the host has dropped its half.
        inbox.recv().unwrap();
        while !session.commands.is_closed() {
            thread::yield_now();
        }

        assert!(matches!(session.send("uci\n"), Err(SessionError::Dead)));
    }
}
