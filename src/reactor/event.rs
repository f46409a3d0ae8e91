/// A readiness event reported by the poller.
///
/// Produced by the poller and consumed by the reactor to complete
/// the pending read registered under `token`.
pub(crate) struct Event {
    /// Slab token of the pending read.
    pub(crate) token: usize,

    /// The descriptor is readable, hung up, or has a pending error.
    pub(crate) readable: bool,
}
