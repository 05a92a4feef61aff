//! A single-slot mailbox over a shared byte region.
//!
//! The mailbox is a fixed-capacity byte buffer plus an atomic length word. A
//! length of zero means the slot is empty and may be written; a non-zero length
//! means a complete message of exactly that many bytes is waiting to be read.
//!
//! There is exactly one writer and one reader for the lifetime of a mailbox.
//! [`channel`] hands out one [`Sender`] and one [`Receiver`]; neither half is
//! `Clone`, and both `send` and `recv` take `&mut self`, so two concurrent
//! writes (or reads) cannot be expressed.
//!
//! Both sides sleep on a condition variable rather than spinning. Dropping
//! either half, or calling `Sender::close`, closes the mailbox and wakes the
//! other side. This is the only way to interrupt a blocked `recv` or `send`
//! from outside.

mod error;

pub use error::{RecvError, RecvTimeoutError, SendError, TryRecvError};

use log::trace;
use parking_lot::{Condvar, Mutex};

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The largest capacity the 32-bit length word can describe.
pub const MAX_CAPACITY: usize = u32::MAX as usize;

/// Create a mailbox able to carry messages of up to `capacity` bytes and
/// return its two halves.
///
/// Panics if `capacity` is zero or does not fit in the 32-bit length word.
pub fn channel(capacity: usize) -> (Sender, Receiver) {
    let mailbox = Arc::new(Mailbox::new(capacity));

    (
        Sender {
            mailbox: Arc::clone(&mailbox),
        },
        Receiver { mailbox },
    )
}

/// The shared region.
struct Mailbox {
    /// Message bytes, always starting at offset 0.
    buffer: UnsafeCell<Box<[u8]>>,
    /// Fixed at construction, kept apart from `buffer` so that neither side has
    /// to touch the buffer just to learn its size.
    capacity: usize,
    /// Zero when empty, otherwise the length of the message in `buffer`.
    length: AtomicU32,
    /// Set once either half has been dropped.
    closed: AtomicBool,
    lock: Mutex<()>,
    signal: Condvar,
}

// SAFETY: `buffer` is only written by the single `Sender` while `length == 0`,
// and only read by the single `Receiver` while `length != 0`. Each side hands
// the buffer over with a `Release` store to `length`, which the other side
// observes with an `Acquire` load before touching the buffer.
unsafe impl Sync for Mailbox {}

impl Mailbox {
    fn new(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity <= MAX_CAPACITY,
            "mailbox capacity must be between 1 and {} bytes",
            MAX_CAPACITY
        );

        Self {
            buffer: UnsafeCell::new(vec![0; capacity].into_boxed_slice()),
            capacity,
            length: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            lock: Mutex::new(()),
            signal: Condvar::new(),
        }
    }

    #[inline]
    fn length(&self) -> usize {
        self.length.load(Ordering::Acquire) as usize
    }

    #[inline]
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sleep while `blocked` holds, or until `deadline` passes. Returns `true`
    /// if the caller was released because `blocked` stopped holding.
    fn wait_while(&self, blocked: impl Fn() -> bool, deadline: Option<Instant>) -> bool {
        if !blocked() {
            return true;
        }

        let mut guard = self.lock.lock();
        while blocked() {
            match deadline {
                Some(deadline) => {
                    if self.signal.wait_until(&mut guard, deadline).timed_out() {
                        return !blocked();
                    }
                }
                None => self.signal.wait(&mut guard),
            }
        }

        true
    }

    /// Wake whichever side is sleeping. The state change must already have been
    /// stored; taking the lock here orders the wake after any waiter's check.
    fn wake(&self) {
        let _guard = self.lock.lock();
        self.signal.notify_all();
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wake();
    }
}

/// The writing half of a mailbox.
pub struct Sender {
    mailbox: Arc<Mailbox>,
}

impl Sender {
    /// Returns true once the mailbox has been closed from either side.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Close the mailbox without dropping this half. A blocked `recv` on the
    /// other side wakes up; a message already in the slot can still be taken.
    pub fn close(&self) {
        self.mailbox.close();
    }

    /// Block until the slot is empty, then publish `bytes` as one message.
    ///
    /// Messages which are empty or larger than the capacity are rejected before
    /// the buffer is touched.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        let mailbox = &*self.mailbox;

        if bytes.is_empty() {
            return Err(SendError::Empty);
        }

        if bytes.len() > mailbox.capacity {
            return Err(SendError::Oversized {
                len: bytes.len(),
                capacity: mailbox.capacity,
            });
        }

        mailbox.wait_while(|| mailbox.length() != 0 && !mailbox.is_closed(), None);

        if mailbox.is_closed() {
            return Err(SendError::Disconnected);
        }

        // SAFETY: `length == 0`, so the receiver will not read the buffer until
        // we publish the new length below, and `&mut self` makes us the only
        // writer.
        unsafe {
            (&mut *mailbox.buffer.get())[..bytes.len()].copy_from_slice(bytes);
        }

        mailbox.length.store(bytes.len() as u32, Ordering::Release);
        mailbox.wake();

        trace!("mailbox: sent {} bytes", bytes.len());
        Ok(())
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.mailbox.close();
    }
}

/// The reading half of a mailbox.
pub struct Receiver {
    mailbox: Arc<Mailbox>,
}

impl Receiver {
    /// Returns true if a message is waiting in the slot.
    pub fn is_pending(&self) -> bool {
        self.mailbox.length() != 0
    }

    /// Returns true once the mailbox has been closed from either side. A
    /// message sent before the close can still be received.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Sleep until a message arrives, take it, and empty the slot.
    pub fn recv(&mut self) -> Result<Vec<u8>, RecvError> {
        match self.recv_deadline(None) {
            Ok(msg) => Ok(msg),
            Err(_) => Err(RecvError::Disconnected),
        }
    }

    /// Like `recv`, but gives up after `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>, RecvTimeoutError> {
        self.recv_deadline(Some(Instant::now() + timeout))
    }

    /// Take a waiting message without blocking.
    pub fn try_recv(&mut self) -> Result<Vec<u8>, TryRecvError> {
        match self.take() {
            Some(msg) => Ok(msg),
            None if self.is_closed() => Err(TryRecvError::Disconnected),
            None => Err(TryRecvError::Empty),
        }
    }

    fn recv_deadline(&mut self, deadline: Option<Instant>) -> Result<Vec<u8>, RecvTimeoutError> {
        let mailbox = &*self.mailbox;

        if !mailbox.wait_while(|| mailbox.length() == 0 && !mailbox.is_closed(), deadline) {
            return Err(RecvTimeoutError::Timeout);
        }

        self.take().ok_or(RecvTimeoutError::Disconnected)
    }

    fn take(&mut self) -> Option<Vec<u8>> {
        let mailbox = &*self.mailbox;

        let len = mailbox.length();
        if len == 0 {
            return None;
        }

        // SAFETY: `length != 0`, so the sender will not write the buffer until we
        // reset the length below, and `&mut self` makes us the only reader.
        let msg = unsafe { (&*mailbox.buffer.get())[..len].to_vec() };

        mailbox.length.store(0, Ordering::Release);
        mailbox.wake();

        trace!("mailbox: received {} bytes", len);
        Some(msg)
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.mailbox.close();
    }
}
