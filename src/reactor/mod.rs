//! The reactor: an explicit completion-dispatch engine.
//!
//! A read is *posted* against an [`IoRequest`](crate::retrieve::IoRequest)
//! together with a [`Continuation`]. The reactor owns both while the read is
//! outstanding and, once the read completes, hands them back by running the
//! continuation from [`Reactor::turn`].
//!
//! The reactor is responsible for:
//! - attempting each read immediately and queueing synchronous completions,
//! - parking reads that would block on the poller until data arrives,
//! - timing out reads that outlive the configured deadline,
//! - applying commands (cancellation) sent from other threads.
//!
//! There is no parallelism: the thread calling [`Reactor::turn`] is the
//! only one that ever touches a request or runs a continuation.

mod core;
mod timer;

pub(crate) mod command;
pub(crate) mod event;
pub(crate) mod operation;
pub(crate) mod poller;

pub use self::core::{Reactor, ReactorHandle, ReactorStats};
pub use operation::Continuation;
