//! Internal data structures used by the reactor.
//!
//! Exposes a [`Slab`] used to map poller tokens to pending reads.

mod slab;

pub(crate) use slab::Slab;
