use crate::error::{RetrieveError, RetrieveResult};
use crate::reactor::poller::platform::{
    domain_of, sys_close, sys_connect, sys_get_socket_error, sys_socket, sys_wait_writable,
};

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;
use tracing::{debug, error};

/// An established TCP connection.
///
/// `Connection` exclusively owns its socket, which is non-blocking once
/// connected. The socket is closed exactly once, when the connection is
/// dropped, whichever way the retrieval ends.
#[derive(Debug)]
pub struct Connection {
    fd: RawFd,
    peer: SocketAddr,
}

impl Connection {
    /// Resolves `host` and opens a TCP connection to it on `port`.
    ///
    /// The first IPv4 address is preferred, falling back to the first
    /// address of any family. Exactly one connection attempt is made.
    ///
    /// `timeout` bounds the handshake; `None` waits for the operating
    /// system's own connect timeout.
    ///
    /// # Errors
    ///
    /// - [`RetrieveError::Resolution`] if `host` cannot be resolved,
    /// - [`RetrieveError::Connect`] if the handshake fails or times out.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> RetrieveResult<Self> {
        let addr = resolve(host, port)?;

        Self::connect_addr(addr, timeout).inspect_err(|err| error!("{err}"))
    }

    /// Opens a TCP connection to an already resolved address.
    pub fn connect_addr(addr: SocketAddr, timeout: Option<Duration>) -> RetrieveResult<Self> {
        let connect_err = |source: io::Error| RetrieveError::Connect { addr, source };

        let fd = sys_socket(domain_of(&addr)).map_err(connect_err)?;

        // Owned from here so every early return closes the socket.
        let connection = Self { fd, peer: addr };

        debug!(%addr, fd, "connecting");

        match sys_connect(fd, &addr) {
            Ok(()) => {}

            Err(err) if err.raw_os_error() == Some(libc::EINPROGRESS) => {
                sys_wait_writable(fd, timeout).map_err(connect_err)?;
                sys_get_socket_error(fd).map_err(connect_err)?;
            }

            Err(err) => return Err(connect_err(err)),
        }

        debug!(%addr, fd, "connected");

        Ok(connection)
    }

    /// Returns the address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl AsRawFd for Connection {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!(peer = %self.peer, fd = self.fd, "closing connection");
        sys_close(self.fd);
    }
}

/// Resolves `host` to the address a connection attempt will use.
///
/// # Errors
///
/// Returns [`RetrieveError::Resolution`] if the lookup fails or yields
/// no address.
pub fn resolve(host: &str, port: u16) -> RetrieveResult<SocketAddr> {
    let resolution_err = |source: io::Error| RetrieveError::Resolution {
        host: host.to_string(),
        source,
    };

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(resolution_err)
        .inspect_err(|err| error!("{err}"))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            resolution_err(io::Error::new(
                io::ErrorKind::NotFound,
                "host resolved to no address",
            ))
        })
        .inspect_err(|err| error!("{err}"))
}
