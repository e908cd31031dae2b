//! Cooperative, single-threaded CSP-style channels.
//!
//! A channel is a rendezvous point between producers and consumers with a
//! pluggable buffering strategy (bounded-blocking, sliding-eviction, or
//! dropping) and an inline reduction pipeline applied to values as they enter
//! the buffer. There are no threads and no blocking: puts and takes register
//! continuations, and a deferred scheduler matches them up on later turns of
//! a [`turnloop::TaskQueue`].

#[macro_use]
extern crate tracing;

mod channel;

pub use crate::channel::api::*;

/// Error types
pub mod error {
    pub use crate::channel::error::*;
}

/// Reduction steps applied to values entering a channel
pub mod reduce {
    pub use crate::channel::reduce::*;
}
