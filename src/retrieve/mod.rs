//! Retrieval of one resource over one connection.
//!
//! A retrieval connects, sends the request line, posts a first read and
//! then drives the reactor until the request finishes:
//!
//! - [`IoRequest`] carries the socket, the reused buffer and the shared
//!   [`RequestStatus`],
//! - [`ReceiveContinuation`] forwards each chunk to an [`OutputSink`] and
//!   reposts,
//! - [`EventLoop`] yields to the reactor until `finished` is observed,
//! - [`Retriever`] ties them together.

mod continuation;
mod event_loop;
mod request;

pub use continuation::{OutputSink, ReceiveContinuation};
pub use event_loop::EventLoop;
pub use request::{IoRequest, RequestStatus};

use crate::builder::RetrieverBuilder;
use crate::error::RetrieveResult;
use crate::net::{Connection, send_request};
use crate::reactor::{Reactor, ReactorHandle, ReactorStats};

use std::io;
use std::os::fd::AsRawFd;
use std::time::Duration;
use tracing::{error, info};

/// Summary of a completed retrieval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transfer {
    /// Bytes forwarded to the sink.
    pub bytes: u64,

    /// Non-empty chunks forwarded to the sink.
    pub chunks: u64,

    /// Reads posted, including the final one that saw the close.
    pub posted: u64,

    /// Completions dispatched, including the zero-length one.
    pub completed: u64,
}

/// Retrieves resources with a completion-driven receive loop.
///
/// A `Retriever` owns the reactor its reads are posted to. Retrievals
/// run one at a time on the calling thread; the reactor can be cancelled
/// from another thread through [`handle`](Self::handle).
///
/// # Examples
///
/// ```rust,ignore
/// let mut retriever = Retriever::builder().port(8080).build()?;
/// let transfer = retriever.retrieve("localhost", "/index.html", std::io::stdout())?;
/// eprintln!("{} bytes", transfer.bytes);
/// ```
pub struct Retriever {
    port: u16,
    buffer_size: usize,
    connect_timeout: Option<Duration>,
    event_loop: EventLoop,
    reactor: Reactor,
}

impl Retriever {
    /// Creates a retriever with the default configuration.
    pub fn new() -> io::Result<Self> {
        RetrieverBuilder::new().build()
    }

    /// Returns a builder to configure a retriever.
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::new()
    }

    pub(crate) fn from_parts(
        port: u16,
        buffer_size: usize,
        connect_timeout: Option<Duration>,
        poll_interval: Duration,
        reactor: Reactor,
    ) -> Self {
        Self {
            port,
            buffer_size,
            connect_timeout,
            event_loop: EventLoop::new(poll_interval),
            reactor,
        }
    }

    /// Returns a handle that cancels this retriever's reads.
    ///
    /// After [`ReactorHandle::shutdown`], the retrieval in progress ends
    /// with [`RetrieveError::Cancelled`](crate::RetrieveError::Cancelled)
    /// and later retrievals fail to post their first read.
    pub fn handle(&self) -> ReactorHandle {
        self.reactor.handle()
    }

    /// Returns the reactor's post and completion counters, accumulated
    /// over every retrieval made with this retriever.
    pub fn stats(&self) -> ReactorStats {
        self.reactor.stats()
    }

    /// Returns the destination port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connects to `host`, requests `path`, and copies the response
    /// into `sink` until the peer closes the connection.
    ///
    /// The connection is closed before this returns, on every path.
    /// Bytes forwarded before a failure stay in `sink`.
    pub fn retrieve<S>(&mut self, host: &str, path: &str, sink: S) -> RetrieveResult<Transfer>
    where
        S: OutputSink + 'static,
    {
        info!(%host, port = self.port, %path, "retrieving");

        let connection = Connection::connect(host, self.port, self.connect_timeout)?;

        self.retrieve_from(&connection, path, sink)
    }

    /// Requests `path` over an established connection and copies the
    /// response into `sink` until the peer closes it.
    pub fn retrieve_from<S>(
        &mut self,
        connection: &Connection,
        path: &str,
        sink: S,
    ) -> RetrieveResult<Transfer>
    where
        S: OutputSink + 'static,
    {
        send_request(connection, path)?;

        let request = IoRequest::new(connection, self.buffer_size);
        let status = request.status();
        let before = self.reactor.stats();

        self.reactor
            .post_read(request, Box::new(ReceiveContinuation::new(sink)))
            .inspect_err(|err| error!("{err}"))?;

        self.event_loop.run(&mut self.reactor, &status);
        self.reactor.release(connection.as_raw_fd());

        let after = self.reactor.stats();

        if let Some(err) = status.take_failure() {
            return Err(err);
        }

        let transfer = Transfer {
            bytes: status.bytes(),
            chunks: status.chunks(),
            posted: after.posted - before.posted,
            completed: after.completed - before.completed,
        };

        info!(
            bytes = transfer.bytes,
            chunks = transfer.chunks,
            peer = %connection.peer_addr(),
            "retrieval complete"
        );

        Ok(transfer)
    }
}
