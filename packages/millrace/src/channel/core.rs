// engine for the channel. the exposed API is a convenience wrapper around
// this. panicky on misuse; the api layer is what checks first.

use super::reduce::{Reducer, Step};
use std::{
    cell::RefCell,
    collections::VecDeque,
    mem,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering::Relaxed},
};
use turnloop::Spawner;

// process-scoped mint for channel ids.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Admission policy for a channel's buffer window
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Strategy {
    /// Bounded; a put against a full buffer parks until capacity frees
    Fixed,
    /// Bounded; a put against a full buffer evicts the oldest buffered value
    Sliding,
    /// Bounded; a put against a full buffer discards the incoming value
    Dropping,
}

// completion callback of a put attempt.
pub(crate) type OnComplete = Box<dyn FnOnce()>;

// a parked take attempt. receives the next buffered value, or the closed
// sentinel once the channel is closed and drained.
pub(crate) type Consumer<T> = Box<dyn FnOnce(Option<T>)>;

// a put attempt awaiting buffer capacity. parked only by Fixed channels.
struct Producer<T> {
    value: T,
    on_complete: Option<OnComplete>,
}

// what became of a put attempt handed to `try_put`.
enum TryPut<T> {
    // the attempt completed: admitted, suppressed, dropped, or terminating
    Complete,
    // fixed channel at capacity; the attempt must stay parked
    Full(Producer<T>),
}

// handle to the channel engine. the public `Channel` wraps this.
pub(crate) struct Core<T: 'static>(Rc<Shared<T>>);

// per-channel data. config lives outside the state cell; everything the
// operations mutate lives inside it.
struct Shared<T: 'static> {
    id: u64,
    strategy: Strategy,
    capacity: usize,
    spawner: Spawner,
    state: RefCell<State<T>>,
}

// state mutated by put/take/close and by scheduler passes.
struct State<T: 'static> {
    // monotonic: never transitions back to open
    closed: bool,
    // whether a scheduler pass is outstanding
    scheduled: bool,
    // already-reduced values awaiting takes, oldest first
    buf: VecDeque<T>,
    // parked put attempts; non-empty only for Fixed channels at capacity
    producers: VecDeque<Producer<T>>,
    // parked take attempts
    consumers: VecDeque<Consumer<T>>,
    reducer: Box<dyn Reducer<T>>,
}

impl<T: 'static> State<T> {
    // feed one value through the reducer into the buffer.
    fn admit(&mut self, value: T) -> Step {
        let State { ref mut reducer, ref mut buf, .. } = *self;
        reducer.step(buf, value)
    }
}

impl<T: 'static> Core<T> {
    pub(crate) fn new(
        strategy: Strategy,
        capacity: usize,
        reducer: Box<dyn Reducer<T>>,
        spawner: Spawner,
    ) -> Self {
        Core(Rc::new(Shared {
            id: NEXT_ID.fetch_add(1, Relaxed),
            strategy,
            capacity,
            spawner,
            state: RefCell::new(State {
                closed: false,
                scheduled: false,
                buf: VecDeque::new(),
                producers: VecDeque::new(),
                consumers: VecDeque::new(),
                reducer,
            }),
        }))
    }

    // clone another handle to the channel.
    pub(crate) fn clone(&self) -> Self {
        Core(Rc::clone(&self.0))
    }

    pub(crate) fn id(&self) -> u64 {
        self.0.id
    }

    pub(crate) fn strategy(&self) -> Strategy {
        self.0.strategy
    }

    pub(crate) fn capacity(&self) -> usize {
        self.0.capacity
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.0.state.borrow().closed
    }

    pub(crate) fn buffered(&self) -> usize {
        self.0.state.borrow().buf.len()
    }

    pub(crate) fn parked_puts(&self) -> usize {
        self.0.state.borrow().producers.len()
    }

    pub(crate) fn parked_takes(&self) -> usize {
        self.0.state.borrow().consumers.len()
    }

    // snapshot of the mutable state for Debug, or None if the state cell is
    // currently borrowed (a reducer formatting its own channel, say).
    pub(crate) fn debug_snapshot(&self) -> Option<(bool, usize, usize, usize)> {
        self.0.state.try_borrow().ok().map(|st| {
            (st.closed, st.buf.len(), st.producers.len(), st.consumers.len())
        })
    }

    // register a put attempt. the channel must not be closed; returns whether
    // the attempt completed (as opposed to parking).
    pub(crate) fn put(&self, value: T, on_complete: Option<OnComplete>) -> bool {
        assert!(!self.is_closed(), "put on a closed channel (internal bug)");
        match self.try_put(Producer { value, on_complete }) {
            TryPut::Complete => true,
            TryPut::Full(producer) => {
                self.0.state.borrow_mut().producers.push_back(producer);
                self.request_run();
                false
            }
        }
    }

    // register a take attempt. always parks; a scheduler pass satisfies it.
    pub(crate) fn take(&self, on_value: Consumer<T>) {
        self.0.state.borrow_mut().consumers.push_back(on_value);
        self.request_run();
    }

    // close the channel. idempotent. parked takes are flushed with the closed
    // sentinel on the next pass; parked puts are abandoned by it.
    pub(crate) fn close(&self) {
        let was_closed = {
            let mut st = self.0.state.borrow_mut();
            mem::replace(&mut st.closed, true)
        };
        if !was_closed {
            trace!(id = self.0.id, "closed");
        }
        self.request_run();
    }

    // run one put attempt, fresh or parked, through the strategy window and
    // the reducer. completion callbacks run after the state borrow is
    // released, so they are free to re-enter the channel.
    fn try_put(&self, producer: Producer<T>) -> TryPut<T> {
        let Producer { value, on_complete } = producer;

        let admission = {
            let mut st = self.0.state.borrow_mut();
            match self.0.strategy {
                Strategy::Fixed => {
                    if st.buf.len() < self.0.capacity {
                        Some(st.admit(value))
                    } else {
                        return TryPut::Full(Producer { value, on_complete });
                    }
                }
                Strategy::Dropping => {
                    if st.buf.len() < self.0.capacity {
                        Some(st.admit(value))
                    } else {
                        // overflow: delivery is best-effort, the value is
                        // discarded without entering the reducer
                        None
                    }
                }
                Strategy::Sliding => {
                    if st.buf.len() == self.0.capacity {
                        // evict the oldest to make room. this happens even if
                        // the reducer goes on to suppress the incoming value.
                        st.buf.pop_front();
                    }
                    Some(st.admit(value))
                }
            }
        };

        match admission {
            Some(Step::Added) | Some(Step::Skipped) => {
                // wake parked takes (no-op when none are parked)
                self.request_run();
            }
            Some(Step::Done) => {
                trace!(id = self.0.id, "reducer exhausted, closing");
                self.close();
            }
            None => {
                trace!(id = self.0.id, "buffer full, dropping value");
            }
        }
        if let Some(on_complete) = on_complete {
            on_complete();
        }
        TryPut::Complete
    }

    // notify the scheduler that the channel probably has some unfinished work
    // and needs a future pass. coalesces: at most one pass is outstanding at
    // any time, and nothing is scheduled while nothing is parked.
    pub(crate) fn request_run(&self) {
        {
            let mut st = self.0.state.borrow_mut();
            if st.scheduled || (st.producers.is_empty() && st.consumers.is_empty()) {
                return;
            }
            st.scheduled = true;
            trace!(
                id = self.0.id,
                buf = st.buf.len(),
                producers = st.producers.len(),
                consumers = st.consumers.len(),
                "pass queued"
            );
        }
        let this = self.clone();
        self.0.spawner.schedule(move || this.run_pass());
    }

    // process all parked puts, then all parked takes. each queue is
    // snapshotted before processing so an attempt that re-parks is not
    // retried within the same pass; the next pass picks it up instead.
    fn run_pass(&self) {
        trace!(id = self.0.id, "pass");

        let mut producers = {
            let mut st = self.0.state.borrow_mut();
            st.scheduled = false;
            mem::take(&mut st.producers)
        };
        while let Some(producer) = producers.pop_front() {
            if self.0.state.borrow().closed {
                // closed mid-pass (a terminating reducer, or close() called
                // from a callback): the rest of the snapshot is abandoned
                // without any completion signal
                trace!(
                    id = self.0.id,
                    abandoned = producers.len() + 1,
                    "closed, abandoning parked puts"
                );
                break;
            }
            if let TryPut::Full(producer) = self.try_put(producer) {
                self.0.state.borrow_mut().producers.push_back(producer);
            }
        }

        let mut consumers = {
            let mut st = self.0.state.borrow_mut();
            mem::take(&mut st.consumers)
        };
        while let Some(consumer) = consumers.pop_front() {
            // decide under the borrow, deliver outside it
            let taken = {
                let mut st = self.0.state.borrow_mut();
                if let Some(value) = st.buf.pop_front() {
                    Some(Some(value))
                } else if st.closed {
                    Some(None)
                } else {
                    None
                }
            };
            match taken {
                Some(value) => {
                    let dequeued = value.is_some();
                    consumer(value);
                    if dequeued {
                        // capacity freed; wake parked puts
                        self.request_run();
                    }
                }
                None => {
                    // nothing buffered and still open: park again for a
                    // future pass. a later put or close wakes us.
                    self.0.state.borrow_mut().consumers.push_back(consumer);
                }
            }
        }
    }
}
