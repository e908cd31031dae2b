// channel error types.

use std::fmt;
use thiserror::Error;

/// Error for putting into a channel that has been closed
///
/// A closed channel never accepts another value. The rejected value rides in
/// the error so the caller can recover it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PutError<T> {
    /// The value the channel refused
    pub value: T,
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("put on a closed channel")
    }
}

impl<T: fmt::Debug> std::error::Error for PutError<T> {}

/// Error for configuring a channel with a zero-size buffer window
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("channel capacity must be at least 1")]
pub struct CapacityError;
