use crate::reactor::Reactor;
use crate::retrieve::Retriever;

use std::io;
use std::time::Duration;

/// Port the request is sent to unless configured otherwise.
pub const DEFAULT_PORT: u16 = 23456;

/// Capacity of the receive buffer reused by every read.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Longest single yield of the event loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Builder for configuring and creating a [`Retriever`].
///
/// # Examples
///
/// ```rust,ignore
/// let retriever = RetrieverBuilder::new()
///     .port(8080)
///     .read_timeout(Duration::from_secs(5))
///     .build()?;
/// ```
#[derive(Clone, Debug)]
pub struct RetrieverBuilder {
    port: u16,
    buffer_size: usize,
    poll_interval: Duration,
    read_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl RetrieverBuilder {
    /// Creates a new `RetrieverBuilder` with default configuration.
    ///
    /// Defaults: port [`DEFAULT_PORT`], a [`DEFAULT_BUFFER_SIZE`]-byte
    /// buffer, [`DEFAULT_POLL_INTERVAL`] yields, no read or connect
    /// deadline.
    pub fn new() -> Self {
        Self {
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_timeout: None,
            connect_timeout: None,
        }
    }

    /// Sets the destination port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the capacity of the receive buffer.
    ///
    /// # Panics
    ///
    /// Panics if `size == 0`.
    pub fn buffer_size(mut self, size: usize) -> Self {
        assert!(size > 0, "buffer_size must be > 0");

        self.buffer_size = size;
        self
    }

    /// Sets the longest time a single event loop iteration waits.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll_interval must be > 0");

        self.poll_interval = interval;
        self
    }

    /// Fails a retrieval when no data arrives for `timeout`.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Bounds the TCP handshake.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Builds the retriever with the configured options.
    ///
    /// This creates the retriever's reactor.
    pub fn build(self) -> io::Result<Retriever> {
        let reactor = Reactor::with_read_timeout(self.read_timeout)?;

        Ok(Retriever::from_parts(
            self.port,
            self.buffer_size,
            self.connect_timeout,
            self.poll_interval,
            reactor,
        ))
    }
}

impl Default for RetrieverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
