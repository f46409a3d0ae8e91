use super::command::Command;
use super::event::Event;
use super::operation::{Completed, Continuation, PendingRead};
use super::poller::platform::{RawFd, sys_read};
use super::poller::{Poller, Waker};
use super::timer::TimerEntry;
use crate::error::PostError;
use crate::retrieve::IoRequest;
use crate::utils::Slab;

use std::cell::Cell;
use std::collections::{BinaryHeap, VecDeque};
use std::io;
use std::mem;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Disarmed deadlines tolerated in the timer heap before it is rebuilt.
const TIMER_SLACK: usize = 32;

/// Counters of posted and completed reads.
///
/// Because at most one read is outstanding per request, `posted` and
/// `completed` never differ by more than the number of live requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReactorStats {
    /// Reads accepted by [`Reactor::post_read`].
    pub posted: u64,

    /// Continuations dispatched.
    pub completed: u64,
}

/// The reactor.
///
/// Owns every outstanding read and runs its continuation once the read
/// completes. It is driven by calling [`turn`](Self::turn) repeatedly
/// from a single thread; each turn is one bounded yield to the poller.
pub struct Reactor {
    /// Channel receiving commands from [`ReactorHandle`]s.
    receiver: Receiver<Command>,

    /// Kept to mint new handles.
    sender: Sender<Command>,

    /// Platform-specific poller.
    poller: Poller,

    /// Buffer used to collect readiness events from the poller.
    events: Vec<Event>,

    /// Min-heap of read deadlines.
    timers: BinaryHeap<TimerEntry>,

    /// Reads parked on the poller, indexed by poller token.
    pending: Slab<PendingRead>,

    /// Completed reads whose continuation has not run yet.
    ready: VecDeque<Completed>,

    /// Deadline applied to every parked read.
    read_timeout: Option<Duration>,

    /// Set once a shutdown command has been applied.
    shut_down: bool,

    stats: ReactorStats,
}

/// A handle used to communicate with a reactor from any thread.
///
/// The reactor itself is bound to the thread driving it; the handle is
/// `Send` and cheap to clone.
#[derive(Clone)]
pub struct ReactorHandle {
    /// Sender side of the command channel.
    sender: Sender<Command>,

    /// Waker used to interrupt the poller.
    waker: Arc<Waker>,
}

impl ReactorHandle {
    /// Cancels every outstanding read and refuses further posts.
    ///
    /// Cancelled reads complete with [`io::ErrorKind::Interrupted`] on
    /// the reactor's next turn. Returns `false` if the reactor is gone.
    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }

    /// Sends a command to the reactor and wakes it.
    fn send(&self, cmd: Command) -> bool {
        if self.sender.send(cmd).is_err() {
            return false;
        }

        self.waker.wake();
        true
    }
}

impl Reactor {
    /// Creates a reactor without a read deadline.
    pub fn new() -> io::Result<Self> {
        Self::with_read_timeout(None)
    }

    /// Creates a reactor that times out reads after `read_timeout`.
    ///
    /// A read that is still parked when its deadline passes completes
    /// with [`io::ErrorKind::TimedOut`].
    pub fn with_read_timeout(read_timeout: Option<Duration>) -> io::Result<Self> {
        let (sender, receiver) = channel();
        let poller = Poller::new()?;

        Ok(Self {
            receiver,
            sender,
            poller,
            events: Vec::with_capacity(16),
            timers: BinaryHeap::new(),
            pending: Slab::new(4),
            ready: VecDeque::new(),
            read_timeout,
            shut_down: false,
            stats: ReactorStats::default(),
        })
    }

    /// Returns a handle that can cancel this reactor from another thread.
    pub fn handle(&self) -> ReactorHandle {
        ReactorHandle {
            sender: self.sender.clone(),
            waker: self.poller.waker(),
        }
    }

    /// Returns the configured read deadline.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Returns the post and completion counters.
    pub fn stats(&self) -> ReactorStats {
        self.stats
    }

    /// Returns `true` if no read is outstanding and no continuation is
    /// waiting to run.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.ready.is_empty()
    }

    /// Posts a non-blocking read into `request`'s buffer.
    ///
    /// The read is attempted immediately. Whether it completes right away
    /// or only once the descriptor becomes readable, `continuation` runs
    /// from a later [`turn`](Self::turn) and never from inside this call.
    ///
    /// # Errors
    ///
    /// - [`PostError::Shutdown`] after [`ReactorHandle::shutdown`],
    /// - [`PostError::Busy`] if a read on the same descriptor is outstanding,
    /// - [`PostError::Register`] if the poller refuses the descriptor.
    ///
    /// On error, `request` and `continuation` are dropped.
    pub fn post_read(
        &mut self,
        mut request: IoRequest,
        continuation: Box<dyn Continuation>,
    ) -> Result<(), PostError> {
        if self.shut_down {
            return Err(PostError::Shutdown);
        }

        let fd = request.fd();
        if self.is_outstanding(fd) {
            return Err(PostError::Busy(fd));
        }

        match sys_read(fd, request.buffer_mut()) {
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                let armed = self
                    .read_timeout
                    .map(|timeout| (Instant::now() + timeout, Rc::new(Cell::new(false))));

                let token = self.pending.insert(PendingRead {
                    request,
                    continuation,
                    deadline: armed.as_ref().map(|(_, cancelled)| cancelled.clone()),
                });

                if let Err(err) = self.poller.register(fd, token) {
                    self.pending.try_remove(token);
                    return Err(PostError::Register(err));
                }

                if let Some((deadline, cancelled)) = armed {
                    self.timers.push(TimerEntry {
                        deadline,
                        token,
                        cancelled,
                    });
                }

                trace!(fd, token, "read parked until readable");
            }

            outcome => {
                trace!(fd, ?outcome, "read completed synchronously");

                self.ready.push_back(Completed {
                    read: PendingRead {
                        request,
                        continuation,
                        deadline: None,
                    },
                    outcome,
                });
            }
        }

        self.stats.posted += 1;
        Ok(())
    }

    /// Drives the reactor once.
    ///
    /// The steps are:
    /// 1. Wait for readiness, at most `max_wait` (or until the next read
    ///    deadline, or not at all when continuations are already queued)
    /// 2. Apply commands received from handles, so a shutdown wins over
    ///    data that became readable in the same wait
    /// 3. Complete the reads whose descriptors became readable
    /// 4. Time out reads whose deadline passed
    /// 5. Run the continuations that were queued before this step
    ///
    /// Returns the number of continuations run.
    pub fn turn(&mut self, max_wait: Duration) -> io::Result<usize> {
        let wait = if self.ready.is_empty() {
            self.timers
                .peek()
                .map(|t| t.deadline.saturating_duration_since(Instant::now()))
                .map_or(max_wait, |until| until.min(max_wait))
        } else {
            Duration::ZERO
        };

        let mut events = mem::take(&mut self.events);
        self.poller.poll(&mut events, Some(wait))?;

        while let Ok(cmd) = self.receiver.try_recv() {
            match cmd {
                Command::Shutdown => self.cancel_all(),
            }
        }

        for event in &events {
            self.handle_event(event);
        }
        self.events = events;

        self.fire_timers();
        self.purge_timers();

        Ok(self.dispatch())
    }

    /// Drops every read outstanding on `fd` without running its
    /// continuation.
    ///
    /// Called before the socket behind `fd` is closed, so that neither the
    /// poller nor a later read can observe a reused descriptor. Returns the
    /// number of reads dropped.
    pub(crate) fn release(&mut self, fd: RawFd) -> usize {
        let parked = self.pending.remove_if(|read| read.request.fd() == fd);

        for read in &parked {
            self.poller.deregister(fd);
            read.disarm();
        }

        let queued = self.ready.len();
        self.ready.retain(|done| done.read.request.fd() != fd);

        self.purge_timers();

        let released = parked.len() + (queued - self.ready.len());
        if released > 0 {
            debug!(fd, released, "released outstanding reads");
        }

        released
    }

    /// Returns `true` if a read on `fd` is parked or awaiting dispatch.
    fn is_outstanding(&self, fd: RawFd) -> bool {
        self.pending.iter().any(|read| read.request.fd() == fd)
            || self.ready.iter().any(|done| done.read.request.fd() == fd)
    }

    /// Completes the parked read behind a readiness event.
    fn handle_event(&mut self, event: &Event) {
        if !event.readable {
            return;
        }

        let Some(read) = self.pending.get_mut(event.token) else {
            return;
        };

        let fd = read.request.fd();
        let outcome = sys_read(fd, read.request.buffer_mut());

        // Spurious wake-up: stay parked.
        if matches!(&outcome, Err(err) if err.kind() == io::ErrorKind::WouldBlock) {
            return;
        }

        if let Some(read) = self.pending.try_remove(event.token) {
            self.poller.deregister(fd);
            read.disarm();

            self.ready.push_back(Completed { read, outcome });
        }
    }

    /// Completes every expired parked read with `TimedOut`.
    fn fire_timers(&mut self) {
        let now = Instant::now();

        while let Some(timer) = self.timers.peek() {
            if timer.deadline > now {
                break;
            }

            let Some(timer) = self.timers.pop() else {
                break;
            };

            if timer.cancelled.get() {
                continue;
            }

            if let Some(read) = self.pending.try_remove(timer.token) {
                let fd = read.request.fd();
                self.poller.deregister(fd);

                warn!(fd, timeout = ?self.read_timeout, "read deadline expired");

                self.ready.push_back(Completed {
                    read,
                    outcome: Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "no data received before the read deadline",
                    )),
                });
            }
        }
    }

    /// Drops the deadlines of reads that completed before expiring.
    ///
    /// Runs only once disarmed entries outnumber parked reads by
    /// [`TIMER_SLACK`], so the heap stays bounded by the number of parked
    /// reads plus that slack.
    fn purge_timers(&mut self) {
        if self.timers.len() <= self.pending.len() + TIMER_SLACK {
            return;
        }

        let before = self.timers.len();
        self.timers.retain(|timer| !timer.cancelled.get());

        trace!(purged = before - self.timers.len(), "purged disarmed deadlines");
    }

    /// Cancels every parked read and refuses further posts.
    fn cancel_all(&mut self) {
        self.shut_down = true;

        let parked = self.pending.remove_if(|_| true);
        debug!(cancelled = parked.len(), "reactor shutting down");

        for read in parked {
            self.poller.deregister(read.request.fd());
            read.disarm();

            self.ready.push_back(Completed {
                read,
                outcome: Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "read cancelled by reactor shutdown",
                )),
            });
        }

        self.timers.clear();
    }

    /// Runs the continuations queued so far.
    ///
    /// Completions queued by these continuations (a repost that completes
    /// synchronously) wait for the next turn.
    fn dispatch(&mut self) -> usize {
        let queued = self.ready.len();

        for _ in 0..queued {
            let Some(Completed { read, outcome }) = self.ready.pop_front() else {
                break;
            };

            self.stats.completed += 1;

            let PendingRead {
                request,
                continuation,
                ..
            } = read;

            continuation.complete(self, request, outcome);
        }

        queued
    }
}
