use std::fmt;

/// Why a message could not be sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendError {
    /// A zero length is reserved to mean "slot empty", so empty messages cannot
    /// be represented.
    Empty,
    /// The message is larger than the mailbox. Nothing was written.
    Oversized { len: usize, capacity: usize },
    /// The receiving half has been dropped.
    Disconnected,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Empty => write!(f, "cannot send an empty message"),
            SendError::Oversized { len, capacity } => write!(
                f,
                "message of {} bytes exceeds mailbox capacity of {} bytes",
                len, capacity
            ),
            SendError::Disconnected => write!(f, "mailbox receiver has been dropped"),
        }
    }
}

impl std::error::Error for SendError {}

/// The sending half was dropped and no message is left in the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecvError {
    Disconnected,
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mailbox sender has been dropped")
    }
}

impl std::error::Error for RecvError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecvTimeoutError {
    Timeout,
    Disconnected,
}

impl fmt::Display for RecvTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecvTimeoutError::Timeout => write!(f, "timed out waiting for a message"),
            RecvTimeoutError::Disconnected => write!(f, "mailbox sender has been dropped"),
        }
    }
}

impl std::error::Error for RecvTimeoutError {}

impl From<RecvError> for RecvTimeoutError {
    fn from(_: RecvError) -> Self {
        RecvTimeoutError::Disconnected
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TryRecvError {
    Empty,
    Disconnected,
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryRecvError::Empty => write!(f, "no message waiting"),
            TryRecvError::Disconnected => write!(f, "mailbox sender has been dropped"),
        }
    }
}

impl std::error::Error for TryRecvError {}
