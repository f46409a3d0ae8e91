use crate::error::RetrieveError;

use std::cell::{Cell, RefCell};
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;

/// The state carried by one posted read.
///
/// Binds a socket to a fixed-capacity buffer and to the shared
/// [`RequestStatus`]. A request is moved into the reactor when a read is
/// posted and handed back to the continuation when it completes, so the
/// buffer is only ever touched by the operation that currently owns it.
/// The buffer is allocated once and reused by every repost.
///
/// The request does not own the socket: the connection it was built
/// from must outlive every read posted with it.
pub struct IoRequest {
    fd: RawFd,
    buffer: Box<[u8]>,
    status: RequestStatus,
}

impl IoRequest {
    /// Creates a request reading from `socket` into a buffer of
    /// `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`, since an empty read is
    /// indistinguishable from the peer closing the stream.
    pub fn new(socket: &impl AsRawFd, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be > 0");

        Self {
            fd: socket.as_raw_fd(),
            buffer: vec![0; capacity].into_boxed_slice(),
            status: RequestStatus::default(),
        }
    }

    /// Returns the socket this request reads from.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Returns the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Returns a handle to the shared status of this request.
    pub fn status(&self) -> RequestStatus {
        self.status.clone()
    }

    /// Returns the first `len` bytes of the buffer.
    ///
    /// After a completion of `n` bytes, `received(n)` is exactly the data
    /// that read delivered.
    pub fn received(&self, len: usize) -> &[u8] {
        &self.buffer[..len]
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}

/// Shared view of a request's progress and termination.
///
/// Cloned out of an [`IoRequest`] before it is posted, so the event loop
/// can watch the request while the reactor owns it. The `finished` flag
/// goes from `false` to `true` exactly once and is the sole signal the
/// event loop waits for.
#[derive(Clone, Default)]
pub struct RequestStatus(Rc<StatusInner>);

#[derive(Default)]
struct StatusInner {
    finished: Cell<bool>,
    failure: RefCell<Option<RetrieveError>>,
    bytes: Cell<u64>,
    chunks: Cell<u64>,
}

impl RequestStatus {
    /// Returns `true` once the request reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.0.finished.get()
    }

    /// Returns `true` if the request finished because of an error.
    pub fn has_failed(&self) -> bool {
        self.0.failure.borrow().is_some()
    }

    /// Total bytes forwarded to the output so far.
    pub fn bytes(&self) -> u64 {
        self.0.bytes.get()
    }

    /// Number of non-empty chunks forwarded so far.
    pub fn chunks(&self) -> u64 {
        self.0.chunks.get()
    }

    /// Takes the recorded failure, if any.
    ///
    /// The request stays finished.
    pub fn take_failure(&self) -> Option<RetrieveError> {
        self.0.failure.borrow_mut().take()
    }

    /// Marks the request finished after an orderly close.
    ///
    /// Returns `false` if it had already finished.
    pub(crate) fn finish(&self) -> bool {
        !self.0.finished.replace(true)
    }

    /// Marks the request finished and records `err` as the cause.
    ///
    /// Returns `false`, and drops `err`, if it had already finished.
    pub(crate) fn fail(&self, err: RetrieveError) -> bool {
        if !self.finish() {
            return false;
        }

        *self.0.failure.borrow_mut() = Some(err);
        true
    }

    pub(crate) fn record_chunk(&self, len: usize) {
        self.0.bytes.set(self.0.bytes.get() + len as u64);
        self.0.chunks.set(self.0.chunks.get() + 1);
    }
}
