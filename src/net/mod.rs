//! Connection setup: the synchronous half of a retrieval.
//!
//! - [`Connection`] resolves a host and performs the TCP handshake,
//! - [`send_request`] writes the one-line request.
//!
//! Both run before the first read is posted to the reactor.

mod connector;
mod request;

pub use connector::{Connection, resolve};
pub use request::{format_request, send_request};
