use super::IoRequest;
use crate::error::RetrieveError;
use crate::reactor::{Continuation, Reactor};

use std::io::{self, Write};
use tracing::{debug, error};

/// Destination of received bytes.
///
/// Chunks are delivered in arrival order, one at a time, from inside the
/// continuation. A sink must not call back into the reactor.
pub trait OutputSink {
    /// Consumes one chunk completely.
    fn deliver(&mut self, chunk: &[u8]) -> io::Result<()>;
}

impl<W: Write> OutputSink for W {
    /// Writes and flushes the chunk, so bytes already delivered survive
    /// a later failure.
    fn deliver(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.write_all(chunk)?;
        self.flush()
    }
}

/// The receive continuation: forwards each chunk and reposts.
///
/// On every completion exactly one of the following happens:
/// - an error: the request is failed, no repost,
/// - zero bytes: the peer closed the stream, the request is finished,
/// - `n` bytes: they are forwarded to the sink, then a new read is
///   posted with the same request and buffer. If the sink or the repost
///   fails, the request is failed.
///
/// Completion errors and repost errors are treated alike: both end the
/// request, so the event loop always terminates.
pub struct ReceiveContinuation<S> {
    sink: S,
}

impl<S: OutputSink> ReceiveContinuation<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S: OutputSink + 'static> Continuation for ReceiveContinuation<S> {
    fn complete(
        mut self: Box<Self>,
        reactor: &mut Reactor,
        request: IoRequest,
        outcome: io::Result<usize>,
    ) {
        let status = request.status();
        let fd = request.fd();

        let received = match outcome {
            Ok(received) => received,
            Err(err) => {
                let err = match err.kind() {
                    io::ErrorKind::TimedOut => {
                        RetrieveError::TimedOut(reactor.read_timeout().unwrap_or_default())
                    }
                    io::ErrorKind::Interrupted => RetrieveError::Cancelled,
                    _ => RetrieveError::Completion(err),
                };

                error!(fd, "{err}");
                status.fail(err);
                return;
            }
        };

        if received == 0 {
            debug!(fd, bytes = status.bytes(), "peer closed the connection");
            status.finish();
            return;
        }

        debug!(fd, "{received} bytes received");

        if let Err(err) = self.sink.deliver(request.received(received)) {
            let err = RetrieveError::Sink(err);
            error!(fd, "{err}");
            status.fail(err);
            return;
        }

        status.record_chunk(received);

        if let Err(err) = reactor.post_read(request, self) {
            let err = RetrieveError::from(err);
            error!(fd, "repost failed: {err}");
            status.fail(err);
        }
    }
}
