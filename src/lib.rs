//! # gethttp
//!
//! **gethttp** retrieves one resource over one TCP connection without
//! blocking on reads. After a single request line (`GET <path>\n`) is
//! sent, a read is *posted* to a reactor together with a continuation.
//! When bytes arrive the continuation forwards them to an output sink and
//! posts the next read on the same buffer; a zero-length read means the
//! peer closed the stream and ends the retrieval.
//!
//! The calling thread drives everything: an [`EventLoop`] repeatedly yields
//! to the [`Reactor`], which runs the continuations of completed reads, until the
//! request's `finished` flag is set. At most one read is outstanding per
//! request, so no locking is involved.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gethttp::Retriever;
//!
//! let mut retriever = Retriever::builder().port(23456).build()?;
//! let transfer = retriever.retrieve("localhost", "/index.html", std::io::stdout())?;
//! eprintln!("{} bytes in {} chunks", transfer.bytes, transfer.chunks);
//! ```
//!
//! ## Modules
//!
//! - [`net`]: connection setup and the request line
//! - [`reactor`]: read posting, completion dispatch and deadlines
//! - [`retrieve`]: request state, the receive continuation, the event loop
//! - [`telemetry`]: tracing subscriber setup for the binary

mod builder;
mod error;
mod utils;

pub mod net;
pub mod reactor;
pub mod retrieve;
pub mod telemetry;

pub use builder::{DEFAULT_BUFFER_SIZE, DEFAULT_POLL_INTERVAL, DEFAULT_PORT, RetrieverBuilder};
pub use error::{PostError, RetrieveError, RetrieveResult};
pub use reactor::{Continuation, Reactor, ReactorHandle, ReactorStats};
pub use retrieve::{
    EventLoop, IoRequest, OutputSink, ReceiveContinuation, RequestStatus, Retriever, Transfer,
};
