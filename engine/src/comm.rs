//! Messages passed from engine-hosting threads back to the controller.
//!
//! Every session's host thread holds a clone of the controller's `Outbox`.
//! Messages are wrapped in an `Envelope` naming the session they came from, so
//! that the controller can drop anything a torn-down session was still saying
//! when it was replaced.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;

/// Identifies one engine session. Never reused within a controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a host message carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Protocol text written to the engine's standard output.
    Stdout,
    /// Diagnostic text for display only.
    Debug,
    /// The engine failed to load or stopped running.
    Alert,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostMessage {
    pub kind: Kind,
    pub content: String,
}

impl HostMessage {
    pub fn stdout(content: impl Into<String>) -> Self {
        Self {
            kind: Kind::Stdout,
            content: content.into(),
        }
    }

    pub fn debug(content: impl Into<String>) -> Self {
        Self {
            kind: Kind::Debug,
            content: content.into(),
        }
    }

    pub fn alert(content: impl Into<String>) -> Self {
        Self {
            kind: Kind::Alert,
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub session: SessionId,
    pub message: HostMessage,
}

pub type Outbox = Sender<Envelope>;
pub type Inbox = Receiver<Envelope>;

/// Create the channel host threads report through. Delivery is in order and
/// sending never blocks.
pub fn channel() -> (Outbox, Inbox) {
    unbounded::<Envelope>()
}
