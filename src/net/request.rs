use super::Connection;
use crate::error::{RetrieveError, RetrieveResult};
use crate::reactor::poller::platform::{sys_send, sys_wait_writable};

use std::io;
use std::os::fd::AsRawFd;
use tracing::{debug, error};

/// Formats the single request line for `path`: `GET <path>\n`.
///
/// # Errors
///
/// Returns [`RetrieveError::InvalidPath`] if `path` is empty or contains
/// a line break, since the line break is the only framing.
pub fn format_request(path: &str) -> RetrieveResult<Vec<u8>> {
    if path.is_empty() || path.contains(['\n', '\r']) {
        return Err(RetrieveError::InvalidPath(path.to_string()));
    }

    Ok(format!("GET {path}\n").into_bytes())
}

/// Sends the request line for `path` over `connection`.
///
/// This is the only blocking step of a retrieval: if the socket cannot
/// take the line right away, the call waits once for it to become
/// writable. The line is sent with a single call and a short send is
/// not retried.
///
/// # Errors
///
/// - [`RetrieveError::InvalidPath`] if `path` cannot be framed,
/// - [`RetrieveError::Send`] if the socket rejects the line,
/// - [`RetrieveError::PartialSend`] if only part of the line was taken.
pub fn send_request(connection: &Connection, path: &str) -> RetrieveResult<()> {
    let line = format_request(path).inspect_err(|err| error!("{err}"))?;
    let fd = connection.as_raw_fd();

    let sent = match sys_send(fd, &line) {
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
            sys_wait_writable(fd, None).and_then(|()| sys_send(fd, &line))
        }
        result => result,
    }
    .map_err(RetrieveError::Send)
    .inspect_err(|err| error!("{err}"))?;

    if sent < line.len() {
        let err = RetrieveError::PartialSend {
            sent,
            expected: line.len(),
        };
        error!("{err}");
        return Err(err);
    }

    debug!(fd, bytes = sent, %path, "request sent");

    Ok(())
}
