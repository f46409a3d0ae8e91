use super::RequestStatus;
use crate::error::RetrieveError;
use crate::reactor::Reactor;

use std::time::Duration;
use tracing::{error, trace};

/// Drives a reactor until one request finishes.
///
/// Each iteration yields the calling thread to the reactor for at most
/// `poll_interval`, letting any completed read run its continuation on
/// this thread, then checks the request's `finished` flag.
///
/// The loop itself has no deadline; a read deadline configured on the
/// reactor is what bounds a silent peer.
pub struct EventLoop {
    poll_interval: Duration,
}

impl EventLoop {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Runs until `status` is finished.
    ///
    /// Always returns with the request finished: a poller failure, or a
    /// reactor left with nothing outstanding for an unfinished request,
    /// is recorded as the request's failure.
    pub fn run(&self, reactor: &mut Reactor, status: &RequestStatus) {
        let mut turns = 0u64;

        loop {
            if let Err(err) = reactor.turn(self.poll_interval) {
                let err = RetrieveError::Reactor(err);
                error!("{err}");
                status.fail(err);
            }

            turns += 1;

            if status.is_finished() {
                trace!(turns, "request finished");
                return;
            }

            if reactor.is_idle() {
                let err = RetrieveError::Stalled;
                error!("{err}");
                status.fail(err);
                return;
            }
        }
    }
}
