use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::time::Duration;

use thiserror::Error;

pub type RetrieveResult<T> = Result<T, RetrieveError>;

/// Why a read could not be submitted to the reactor.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("reactor has been shut down")]
    Shutdown,

    #[error("a read is already outstanding on descriptor {0}")]
    Busy(RawFd),

    #[error("poller refused the descriptor: {0}")]
    Register(#[source] io::Error),
}

/// Every way a retrieval can fail.
///
/// Each variant is terminal: nothing is retried, and bytes already
/// forwarded to the output stay there.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("cannot resolve host {host}: {source}")]
    Resolution {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("sending request failed: {0}")]
    Send(#[source] io::Error),

    #[error("request only partially sent ({sent} of {expected} bytes)")]
    PartialSend { sent: usize, expected: usize },

    #[error("invalid resource path {0:?}")]
    InvalidPath(String),

    #[error("posting read failed: {0}")]
    Post(#[from] PostError),

    #[error("read completed with error: {0}")]
    Completion(#[source] io::Error),

    #[error("no data received within {0:?}")]
    TimedOut(Duration),

    #[error("retrieval cancelled")]
    Cancelled,

    #[error("writing to output failed: {0}")]
    Sink(#[source] io::Error),

    #[error("reactor failure: {0}")]
    Reactor(#[source] io::Error),

    #[error("event loop stalled with no read outstanding")]
    Stalled,
}

impl RetrieveError {
    /// Process exit status reported by the command-line tool.
    ///
    /// `2` is left to argument parsing errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            RetrieveError::Resolution { .. } => 3,
            RetrieveError::Connect { .. } => 4,
            RetrieveError::Send(_)
            | RetrieveError::PartialSend { .. }
            | RetrieveError::InvalidPath(_) => 5,
            RetrieveError::Post(_) | RetrieveError::Completion(_) => 6,
            RetrieveError::TimedOut(_) => 7,
            RetrieveError::Cancelled => 8,
            RetrieveError::Sink(_) => 9,
            RetrieveError::Reactor(_) | RetrieveError::Stalled => 1,
        }
    }
}
