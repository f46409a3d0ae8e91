/// A simple slab of pending entries.
///
/// A `Slab` stores values in a contiguous array and hands out small,
/// reusable indices. The reactor uses those indices as poller tokens,
/// so a token stays valid exactly as long as its entry is stored.
pub(crate) struct Slab<T> {
    /// Storage for entries; `None` marks a free slot.
    items: Vec<Option<T>>,

    /// Stack of free indices that can be reused.
    free: Vec<usize>,

    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with `size` pre-allocated free slots.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| None).collect();
        let free = (0..size).rev().collect();

        Self {
            items,
            free,
            len: 0,
        }
    }

    /// Inserts a value into the slab and returns its index.
    ///
    /// Free slots are reused lowest-index first; the slab grows when
    /// none are left.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.items.push(None);
                self.items.len() - 1
            }
        };

        self.items[index] = Some(item);
        self.len += 1;

        index
    }

    /// Removes and returns the value stored at `index`, if any.
    ///
    /// The slot becomes free and may be reused by future insertions.
    pub(crate) fn try_remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;

        self.free.push(index);
        self.len -= 1;

        Some(item)
    }

    /// Returns a mutable reference to the value at `index`, if occupied.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)?.as_mut()
    }

    /// Removes every value matching `pred`, in index order.
    pub(crate) fn remove_if(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();

        for (index, slot) in self.items.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(&mut pred) {
                if let Some(item) = slot.take() {
                    removed.push(item);
                    self.free.push(index);
                }
            }
        }

        self.len -= removed.len();
        removed
    }

    /// Returns the number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot is occupied.
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over occupied slots.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(Option::as_ref)
    }
}
