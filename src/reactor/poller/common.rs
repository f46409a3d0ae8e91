use std::os::fd::RawFd;

/// Wake-up handle for a blocked poller.
///
/// Wraps the descriptor the poller listens on for out-of-band wake-ups
/// (an `eventfd` on Linux). Shared between the reactor thread and any
/// [`ReactorHandle`](crate::reactor::ReactorHandle) clones.
pub(crate) struct Waker(pub(crate) RawFd);

unsafe impl Send for Waker {}
unsafe impl Sync for Waker {}

impl Drop for Waker {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}
