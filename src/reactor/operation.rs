use super::Reactor;
use crate::retrieve::IoRequest;

use std::cell::Cell;
use std::io;
use std::rc::Rc;

/// Code run by the reactor when a posted read completes.
///
/// The reactor hands back the request it was given, with the received
/// bytes at the front of its buffer, together with the outcome of the
/// read. The continuation owns the request again from that point: it
/// either reposts it through `reactor` or lets it go.
///
/// Continuations are never run inline from [`Reactor::post_read`]; they
/// are dispatched from [`Reactor::turn`], one at a time, on the thread
/// driving the reactor.
pub trait Continuation {
    /// Consumes a completed read.
    ///
    /// `outcome` is `Ok(n)` with `n` bytes received (`0` on orderly
    /// peer close), or the error the read failed with.
    fn complete(self: Box<Self>, reactor: &mut Reactor, request: IoRequest, outcome: io::Result<usize>);
}

/// A read that has been posted and has not completed yet.
///
/// Its slab token is the operation handle: exactly one exists per
/// outstanding read.
pub(crate) struct PendingRead {
    pub(crate) request: IoRequest,

    pub(crate) continuation: Box<dyn Continuation>,

    /// Cancellation flag of the armed read deadline, if any.
    pub(crate) deadline: Option<Rc<Cell<bool>>>,
}

impl PendingRead {
    /// Cancels the read deadline so a reused token is not timed out.
    pub(crate) fn disarm(&self) {
        if let Some(cancelled) = &self.deadline {
            cancelled.set(true);
        }
    }
}

/// A read whose outcome is known and whose continuation is queued.
pub(crate) struct Completed {
    pub(crate) read: PendingRead,
    pub(crate) outcome: io::Result<usize>,
}
