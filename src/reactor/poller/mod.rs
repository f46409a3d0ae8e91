//! Platform-specific I/O poller abstraction.
//!
//! The poller is used by the reactor to:
//! - wait for read readiness on descriptors with a pending read,
//! - wake the reactor when a [`ReactorHandle`](crate::reactor::ReactorHandle)
//!   submits a command from another thread,
//! - bound each wait so the event loop yields in short increments.
//!
//! The concrete implementation is selected at compile time
//! depending on the target operating system.

pub(crate) mod common;

pub(crate) use common::Waker;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
