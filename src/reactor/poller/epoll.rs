//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Register descriptors that have a read outstanding
//! - Block (for a bounded time) waiting for read readiness
//! - Wake the reactor when a command is submitted from another thread
//!
//! This backend is selected automatically on Linux targets.

use crate::reactor::event::Event;
use crate::reactor::poller::Waker;
use crate::reactor::poller::platform::duration_to_millis;

use libc::{
    EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLERR, EPOLLHUP,
    EPOLLIN, EPOLLRDHUP, epoll_create1, epoll_ctl, epoll_event, epoll_wait, eventfd,
};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Reserved token used internally for the wake-up event.
///
/// Slab tokens are dense small integers, so `u64::MAX` never collides.
const WAKE_TOKEN: u64 = u64::MAX;

/// Linux `epoll` poller.
///
/// This poller owns:
/// - an `epoll` instance,
/// - an internal `eventfd` used as a wake-up signal,
/// - a reusable event buffer.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,

    /// Waker wrapping the internal eventfd.
    waker: Arc<Waker>,
}

impl Waker {
    /// Wake the poller.
    ///
    /// This writes to the internal `eventfd`, causing `epoll_wait`
    /// to return immediately.
    pub(crate) fn wake(&self) {
        let buf: u64 = 1;
        unsafe {
            libc::write(self.0, &buf as *const _ as *const _, 8);
        }
    }

    /// Clears a pending wake-up so the next wait blocks again.
    fn reset(&self) {
        let mut buf = 0u64;
        unsafe {
            libc::read(self.0, &mut buf as *mut _ as *mut _, 8);
        }
    }
}

impl EpollPoller {
    /// Create a new `EpollPoller`.
    ///
    /// Creates the epoll instance and a non-blocking `eventfd`, and
    /// registers the eventfd as a persistent wake source.
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let wake_fd = unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) };
        if wake_fd < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(epoll) };
            return Err(err);
        }

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN,
        };

        let rc = unsafe { epoll_ctl(epoll, EPOLL_CTL_ADD, wake_fd, &mut event) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(wake_fd);
                libc::close(epoll);
            }
            return Err(err);
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(16),
            waker: Arc::new(Waker(wake_fd)),
        })
    }

    /// Return the poller waker.
    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Register `fd` for read readiness under `token`.
    ///
    /// Peer hang-up and socket errors are reported as readable so the
    /// pending read observes them.
    pub(crate) fn register(&self, fd: RawFd, token: usize) -> io::Result<()> {
        let mut event = epoll_event {
            events: (EPOLLIN | EPOLLRDHUP) as u32,
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Remove a file descriptor from the poller.
    pub(crate) fn deregister(&self, fd: RawFd) {
        unsafe {
            epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut());
        }
    }

    /// Poll for read readiness.
    ///
    /// Blocks until a registered descriptor becomes ready, the wake
    /// event is triggered, or `timeout` expires. `None` waits forever.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let timeout_ms = timeout.map(duration_to_millis).unwrap_or(-1);

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            if ev.u64 == WAKE_TOKEN {
                self.waker.reset();
                continue;
            }

            let readable =
                ev.events & ((EPOLLIN | EPOLLRDHUP | EPOLLERR | EPOLLHUP) as u32) != 0;

            events.push(Event {
                token: ev.u64 as usize,
                readable,
            });
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    /// Closes the epoll instance.
    ///
    /// The eventfd is owned by the [`Waker`] and outlives the poller
    /// while reactor handles still hold it.
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll);
        }
    }
}
