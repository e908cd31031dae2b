// exposed API of channels

use super::{
    core::{self, Core},
    error::{CapacityError, PutError},
    reduce::{Identity, Reducer},
};
use std::fmt::{self, Debug, Formatter};
use turnloop::Spawner;

pub use super::core::Strategy;

/// Outcome of a [`put`](Channel::put) the channel did not refuse
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PutOutcome {
    /// The attempt completed immediately: the value was admitted, suppressed
    /// by the reducer, or discarded by a full [`Dropping`](Strategy::Dropping)
    /// window
    Completed,
    /// The channel is [`Fixed`](Strategy::Fixed) and at capacity; the attempt
    /// is parked and will be retried by a later scheduler pass
    Parked,
}

/// Create a channel
///
/// `capacity` is the buffer window size and must be positive. `spawner` is
/// the deferred-turn capability of the host's [`turnloop::TaskQueue`]; all
/// matching of parked puts to parked takes happens on turns of that queue,
/// never inline with the call that made it necessary.
pub fn channel<T: 'static>(
    strategy: Strategy,
    capacity: usize,
    spawner: Spawner,
) -> Result<Channel<T>, CapacityError> {
    channel_with(strategy, capacity, Identity, spawner)
}

/// Create a channel with a reduction step applied to each value on its way
/// into the buffer
///
/// See [`reduce`](crate::reduce) for the step contract and the built-in
/// steps. A step that reports [`Done`](crate::reduce::Step::Done) closes the
/// channel as a side effect of the put that fed it.
pub fn channel_with<T: 'static>(
    strategy: Strategy,
    capacity: usize,
    reducer: impl Reducer<T> + 'static,
    spawner: Spawner,
) -> Result<Channel<T>, CapacityError> {
    if capacity == 0 {
        return Err(CapacityError);
    }
    Ok(Channel(Core::new(strategy, capacity, Box::new(reducer), spawner)))
}

/// Shared handle to a cooperative channel
///
/// Clones share one underlying channel; producers and consumers all hold the
/// same state, reclaimed once the last handle (including handles captured by
/// still-parked callbacks) drops. Everything is single-threaded: the handle
/// is deliberately not `Send`, and no operation ever blocks the caller.
pub struct Channel<T: 'static>(Core<T>);

impl<T: 'static> Channel<T> {
    /// Put a value into the channel
    ///
    /// Fails if the channel is closed, handing the value back. Otherwise the
    /// value is run through the strategy window and the channel's reduction
    /// step: `Fixed` admits or parks the attempt until capacity frees,
    /// `Sliding` evicts the oldest buffered value to make room, and
    /// `Dropping` discards the incoming value when full (still counted as
    /// completed — delivery there is best-effort).
    pub fn put(&self, value: T) -> Result<PutOutcome, PutError<T>> {
        self.put_inner(value, None)
    }

    /// Put a value, running `on_complete` when the attempt completes
    ///
    /// The callback fires once the channel has finished with the attempt —
    /// admitted, suppressed by the reducer, or discarded by a full `Dropping`
    /// window — inline when that happens synchronously, otherwise from the
    /// scheduler pass that admits the parked attempt. An attempt abandoned
    /// because the channel closed while it was parked never fires it.
    pub fn put_with(
        &self,
        value: T,
        on_complete: impl FnOnce() + 'static,
    ) -> Result<PutOutcome, PutError<T>> {
        self.put_inner(value, Some(Box::new(on_complete)))
    }

    fn put_inner(
        &self,
        value: T,
        on_complete: Option<core::OnComplete>,
    ) -> Result<PutOutcome, PutError<T>> {
        if self.0.is_closed() {
            return Err(PutError { value });
        }
        Ok(if self.0.put(value, on_complete) {
            PutOutcome::Completed
        } else {
            PutOutcome::Parked
        })
    }

    /// Take the next value from the channel
    ///
    /// Never fails. `on_value` runs on a later turn with `Some(value)` once a
    /// value is available (oldest first), or with `None` — the closed
    /// sentinel — once the channel is closed and drained. The sentinel is
    /// distinguishable from every legitimate payload: a channel of
    /// `Option<U>` delivers a null-ish payload as `Some(None)`.
    ///
    /// A take against an open, empty channel stays parked until a value
    /// arrives or the channel closes; there is no way to cancel it.
    pub fn take(&self, on_value: impl FnOnce(Option<T>) + 'static) {
        self.0.take(Box::new(on_value));
    }

    /// Close the channel
    ///
    /// Idempotent. Closing refuses every later put, resolves parked and
    /// future takes with the closed sentinel once the buffer drains, and
    /// abandons parked put attempts without completing them.
    pub fn close(&self) {
        self.0.close();
    }

    /// Identifier minted at creation, unique within the process
    pub fn id(&self) -> u64 {
        self.0.id()
    }

    /// The channel's admission policy
    pub fn strategy(&self) -> Strategy {
        self.0.strategy()
    }

    /// The buffer window size
    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    /// Whether the channel has been closed
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Number of buffered values awaiting takes
    pub fn len(&self) -> usize {
        self.0.buffered()
    }

    /// Whether no values are buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of parked put attempts (only ever non-zero for `Fixed`)
    pub fn pending_puts(&self) -> usize {
        self.0.parked_puts()
    }

    /// Number of parked take callbacks
    pub fn pending_takes(&self) -> usize {
        self.0.parked_takes()
    }
}

impl<T: 'static> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Channel(self.0.clone())
    }
}

impl<T: 'static> Debug for Channel<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut d = f.debug_struct("Channel");
        d.field("id", &self.0.id())
            .field("strategy", &self.0.strategy())
            .field("capacity", &self.0.capacity());
        if let Some((closed, buffered, puts, takes)) = self.0.debug_snapshot() {
            d.field("closed", &closed)
                .field("buffered", &buffered)
                .field("pending_puts", &puts)
                .field("pending_takes", &takes);
        }
        d.finish_non_exhaustive()
    }
}


// ==== tests ====
