// reduction steps applied to each value on its way into a channel's buffer.

use smallvec::SmallVec;
use std::{collections::VecDeque, mem};

// chains longer than this spill to the heap.
const IN_PLACE_STAGES: usize = 4;

/// Outcome of a single reducer step
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Step {
    /// The input, possibly transformed, was appended to the accumulator
    Added,
    /// The input was suppressed; the accumulator is untouched
    Skipped,
    /// The reduction is exhausted and the stream should terminate
    ///
    /// The accumulator may carry a final value appended by this same step. A
    /// channel closes as soon as its reducer reports this.
    Done,
}

/// A transformation applied to each value before it enters a channel's buffer
///
/// Steps may be stateful (internal counters), which is how bounded-count
/// semantics like "forward only the first n values" work. A step appends its
/// output to `accum` itself; the buffer window is checked before the step
/// runs, so a step that appends more than one value can overshoot the window.
///
/// A reducer runs while its channel's state is borrowed and must not call
/// back into that channel.
pub trait Reducer<T> {
    /// Optional setup hook
    ///
    /// Honored by convention for composability with other step
    /// implementations; the channel engine never calls it.
    fn init(&mut self) {}

    /// Feed one input through the step, appending any output to `accum`
    fn step(&mut self, accum: &mut VecDeque<T>, input: T) -> Step;

    /// Optional completion hook
    ///
    /// Honored by convention; the channel engine never calls it.
    fn result(&mut self, _accum: &mut VecDeque<T>) {}
}

/// Reducer that admits every value unchanged
#[derive(Debug, Default, Copy, Clone)]
pub struct Identity;

impl<T> Reducer<T> for Identity {
    fn step(&mut self, accum: &mut VecDeque<T>, input: T) -> Step {
        accum.push_back(input);
        Step::Added
    }
}

/// Reducer that admits `f` of every value
pub fn map<F>(f: F) -> Map<F> {
    Map(f)
}

/// See [`map`]
pub struct Map<F>(F);

impl<T, F: FnMut(T) -> T> Reducer<T> for Map<F> {
    fn step(&mut self, accum: &mut VecDeque<T>, input: T) -> Step {
        accum.push_back((self.0)(input));
        Step::Added
    }
}

/// Reducer that suppresses values failing `pred`
pub fn filter<F>(pred: F) -> Filter<F> {
    Filter(pred)
}

/// See [`filter`]
pub struct Filter<F>(F);

impl<T, F: FnMut(&T) -> bool> Reducer<T> for Filter<F> {
    fn step(&mut self, accum: &mut VecDeque<T>, input: T) -> Step {
        if (self.0)(&input) {
            accum.push_back(input);
            Step::Added
        } else {
            Step::Skipped
        }
    }
}

/// Reducer that forwards only the first `n` values, then terminates the
/// stream
///
/// The n-th value is still admitted; the step reports [`Step::Done`] along
/// with it, so a channel using this closes with the n-th value buffered.
pub fn take(n: usize) -> Take {
    Take { left: n }
}

/// See [`take`]
#[derive(Debug, Copy, Clone)]
pub struct Take {
    left: usize,
}

impl<T> Reducer<T> for Take {
    fn step(&mut self, accum: &mut VecDeque<T>, input: T) -> Step {
        if self.left == 0 {
            return Step::Done;
        }
        self.left -= 1;
        accum.push_back(input);
        if self.left == 0 {
            Step::Done
        } else {
            Step::Added
        }
    }
}

/// Reducer that suppresses the first `n` values
pub fn skip(n: usize) -> Skip {
    Skip { left: n }
}

/// See [`skip`]
#[derive(Debug, Copy, Clone)]
pub struct Skip {
    left: usize,
}

impl<T> Reducer<T> for Skip {
    fn step(&mut self, accum: &mut VecDeque<T>, input: T) -> Step {
        if self.left > 0 {
            self.left -= 1;
            Step::Skipped
        } else {
            accum.push_back(input);
            Step::Added
        }
    }
}

/// Left-to-right chain of reducer stages
///
/// Each stage's emissions feed the next stage; only values that survive every
/// stage reach the real accumulator. A stage that suppresses a value
/// short-circuits the stages after it for that value, and a stage that
/// reports [`Step::Done`] terminates the stream once the values already in
/// flight have landed. An empty chain behaves like [`Identity`].
pub struct Chain<T: 'static> {
    stages: SmallVec<[Box<dyn Reducer<T>>; IN_PLACE_STAGES]>,
    // scratch queues for threading emissions between stages, reused across
    // steps to avoid reallocating
    feed: VecDeque<T>,
    emit: VecDeque<T>,
}

impl<T: 'static> Chain<T> {
    /// Construct an empty chain
    pub fn new() -> Self {
        Chain {
            stages: SmallVec::new(),
            feed: VecDeque::new(),
            emit: VecDeque::new(),
        }
    }

    /// Append a stage to the end of the chain
    pub fn then(mut self, stage: impl Reducer<T> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }
}

impl<T: 'static> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Reducer<T> for Chain<T> {
    fn init(&mut self) {
        for stage in &mut self.stages {
            stage.init();
        }
    }

    fn step(&mut self, accum: &mut VecDeque<T>, input: T) -> Step {
        debug_assert!(self.feed.is_empty() && self.emit.is_empty());
        self.feed.push_back(input);
        let mut done = false;
        for stage in &mut self.stages {
            while let Some(value) = self.feed.pop_front() {
                if stage.step(&mut self.emit, value) == Step::Done {
                    done = true;
                }
            }
            mem::swap(&mut self.feed, &mut self.emit);
            if self.feed.is_empty() {
                break;
            }
        }
        let added = !self.feed.is_empty();
        accum.append(&mut self.feed);
        if done {
            Step::Done
        } else if added {
            Step::Added
        } else {
            Step::Skipped
        }
    }

    fn result(&mut self, accum: &mut VecDeque<T>) {
        for stage in &mut self.stages {
            stage.result(accum);
        }
    }
}
