use libc::{
    AF_INET, AF_INET6, F_GETFL, F_SETFL, MSG_NOSIGNAL, O_NONBLOCK, POLLOUT, SO_ERROR, SOCK_CLOEXEC,
    SOCK_STREAM, SOL_SOCKET, c_int, c_void, close, connect, fcntl, getsockopt, poll, pollfd, read,
    send, sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, socket, socklen_t,
};
use std::net::SocketAddr;
use std::time::Duration;
use std::{io, mem};

pub(crate) use std::os::fd::RawFd;

/// Reads from a file descriptor into the given buffer.
///
/// Returns the number of bytes read; `Ok(0)` means the peer closed the
/// stream. The file descriptor **must** be non-blocking, so a read with no
/// data available fails with [`io::ErrorKind::WouldBlock`].
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        let n = unsafe { read(fd, buffer.as_mut_ptr() as *mut c_void, buffer.len()) };

        if n >= 0 {
            return Ok(n as usize);
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Sends the buffer on a connected socket with a single `send(2)` call.
///
/// `SIGPIPE` is suppressed; a closed peer surfaces as `BrokenPipe`.
pub(crate) fn sys_send(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    loop {
        let n = unsafe {
            send(
                fd,
                buffer.as_ptr() as *const c_void,
                buffer.len(),
                MSG_NOSIGNAL,
            )
        };

        if n >= 0 {
            return Ok(n as usize);
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Sets a file descriptor to non-blocking mode.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Creates a non-blocking, close-on-exec stream socket.
pub(crate) fn sys_socket(domain: c_int) -> io::Result<RawFd> {
    let fd = unsafe { socket(domain, SOCK_STREAM | SOCK_CLOEXEC, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    if let Err(e) = sys_set_nonblocking(fd) {
        unsafe { close(fd) };
        return Err(e);
    }

    Ok(fd)
}

/// Initiates a non-blocking connection.
///
/// On a non-blocking socket this usually fails with `EINPROGRESS`;
/// completion is observed with [`sys_wait_writable`] and
/// [`sys_get_socket_error`].
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);

    let rc = unsafe { connect(fd, &storage as *const _ as *const sockaddr, len) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Returns the pending error of a socket (`SO_ERROR`), if any.
pub(crate) fn sys_get_socket_error(fd: RawFd) -> io::Result<()> {
    let mut err: c_int = 0;
    let mut len = mem::size_of::<c_int>() as socklen_t;

    let rc = unsafe {
        getsockopt(
            fd,
            SOL_SOCKET,
            SO_ERROR,
            &mut err as *mut _ as *mut c_void,
            &mut len,
        )
    };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else if err != 0 {
        Err(io::Error::from_raw_os_error(err))
    } else {
        Ok(())
    }
}

/// Blocks until `fd` is writable or `timeout` expires.
///
/// Returns `TimedOut` on expiry. `None` waits forever.
pub(crate) fn sys_wait_writable(fd: RawFd, timeout: Option<Duration>) -> io::Result<()> {
    let timeout_ms = timeout.map(duration_to_millis).unwrap_or(-1);

    let mut pfd = pollfd {
        fd,
        events: POLLOUT,
        revents: 0,
    };

    loop {
        let rc = unsafe { poll(&mut pfd, 1, timeout_ms) };

        if rc > 0 {
            return Ok(());
        }

        if rc == 0 {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "timed out waiting for socket to become writable",
            ));
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Rounds a wait up to whole milliseconds so short waits never spin.
pub(crate) fn duration_to_millis(timeout: Duration) -> c_int {
    let millis = timeout.as_micros().div_ceil(1000);
    millis.min(c_int::MAX as u128) as c_int
}

/// Returns the socket domain matching an address family.
pub(crate) fn domain_of(addr: &SocketAddr) -> c_int {
    match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    }
}

/// Converts a `SocketAddr` to a `sockaddr_storage`.
pub(crate) fn socketaddr_to_storage(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    match addr {
        SocketAddr::V4(v4) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            sa.sin_family = AF_INET as _;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            (storage, mem::size_of::<sockaddr_in>() as socklen_t)
        }

        SocketAddr::V6(v6) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            sa.sin6_family = AF_INET6 as _;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            sa.sin6_flowinfo = v6.flowinfo();
            sa.sin6_scope_id = v6.scope_id();

            (storage, mem::size_of::<sockaddr_in6>() as socklen_t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_sub_millisecond_wait_rounds_up() {
        assert_eq!(duration_to_millis(Duration::ZERO), 0);
        assert_eq!(duration_to_millis(Duration::from_micros(1)), 1);
        assert_eq!(duration_to_millis(Duration::from_micros(1500)), 2);
        assert_eq!(duration_to_millis(Duration::from_millis(10)), 10);
        assert_eq!(duration_to_millis(Duration::from_secs(u64::MAX)), c_int::MAX);
    }

    #[test]
    fn test_sub_millisecond_deadline_still_waits() {
        let (socket, _peer) = UnixStream::pair().expect("Failed to create socket pair");

        sys_wait_writable(socket.as_raw_fd(), Some(Duration::from_micros(500)))
            .expect("A writable socket must be reported within a sub-millisecond deadline");
    }
}
