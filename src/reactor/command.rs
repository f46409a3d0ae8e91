/// A request sent to the reactor from another thread.
///
/// Commands are queued on a channel and applied during the
/// next [`Reactor::turn`](super::Reactor::turn).
pub(crate) enum Command {
    /// Cancel every outstanding read and refuse further posts.
    Shutdown,
}
