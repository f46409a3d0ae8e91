use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;
use std::time::Instant;

/// A read deadline in the reactor timer queue.
///
/// Stored inside a `BinaryHeap` ordered by deadline. The entry is
/// cancelled when its read completes first, since the slab token it
/// names may be reused by a later read.
pub(crate) struct TimerEntry {
    /// The time at which the read times out.
    pub(crate) deadline: Instant,

    /// Slab token of the pending read.
    pub(crate) token: usize,

    /// Cancellation flag shared with the pending read.
    pub(crate) cancelled: Rc<Cell<bool>>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline.eq(&other.deadline)
    }
}

impl Ord for TimerEntry {
    /// Reversed so that `BinaryHeap<TimerEntry>` pops the earliest
    /// deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.deadline.cmp(&self.deadline)
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
