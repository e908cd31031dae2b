//! Single-threaded deferred-task queue.
//!
//! A [`TaskQueue`] owns a FIFO of queued closures. A [`Spawner`] is a cheap
//! cloneable handle that schedules a closure to run on a *future turn* of the
//! queue — never inline with the call that scheduled it. Draining the queue is
//! the host's job: embed [`TaskQueue::run`] (or [`TaskQueue::tick`]) wherever
//! the surrounding program pumps its event loop.
//!
//! There is no threading here at all. Tasks run on whichever thread drains
//! the queue, one at a time, and a task may schedule further tasks while it
//! runs; those land at the back of the queue and run on later turns of the
//! same drain.

use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::{Rc, Weak},
};
use tracing::trace;

type Task = Box<dyn FnOnce()>;

/// Owner of a queue of deferred tasks.
///
/// Dropping the queue drops every task still queued without running it;
/// spawners that outlive the queue silently discard anything scheduled on
/// them afterwards.
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    /// Construct an empty queue.
    pub fn new() -> Self {
        TaskQueue { tasks: Rc::new(RefCell::new(VecDeque::new())) }
    }

    /// Hand out a scheduling handle for this queue.
    pub fn spawner(&self) -> Spawner {
        Spawner { tasks: Rc::downgrade(&self.tasks) }
    }

    /// Number of tasks currently queued.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Whether no tasks are currently queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the frontmost task, if any. Returns whether a task ran.
    ///
    /// The queue is not borrowed while the task runs, so the task is free to
    /// schedule more tasks through a [`Spawner`].
    pub fn tick(&self) -> bool {
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks scheduled by the
    /// tasks run along the way. Each task is one turn.
    pub fn run(&self) {
        let mut turns = 0usize;
        while self.tick() {
            turns += 1;
        }
        trace!(turns, "task queue drained");
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable capability for scheduling tasks onto a [`TaskQueue`].
///
/// Holds the queue weakly: once the owning queue is dropped, scheduling
/// becomes a no-op and the task is dropped immediately.
#[derive(Clone)]
pub struct Spawner {
    tasks: Weak<RefCell<VecDeque<Task>>>,
}

impl Spawner {
    /// Schedule `task` to run on a future turn of the owning queue.
    pub fn schedule(&self, task: impl FnOnce() + 'static) {
        match self.tasks.upgrade() {
            Some(tasks) => tasks.borrow_mut().push_back(Box::new(task)),
            None => trace!("task scheduled on a dead queue, discarding"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_in_fifo_order() {
        let queue = TaskQueue::new();
        let spawner = queue.spawner();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for i in 0..5 {
            let seen = Rc::clone(&seen);
            spawner.schedule(move || seen.borrow_mut().push(i));
        }
        assert_eq!(queue.len(), 5);
        queue.run();
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_scheduled_mid_drain_run_on_later_turns() {
        let queue = TaskQueue::new();
        let spawner = queue.spawner();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = Rc::clone(&seen);
            let inner_spawner = spawner.clone();
            spawner.schedule(move || {
                seen.borrow_mut().push("outer");
                let seen = Rc::clone(&seen);
                inner_spawner.schedule(move || seen.borrow_mut().push("inner"));
            });
        }
        {
            let seen = Rc::clone(&seen);
            spawner.schedule(move || seen.borrow_mut().push("sibling"));
        }
        queue.run();
        // the task spawned mid-drain lands behind everything already queued
        assert_eq!(*seen.borrow(), vec!["outer", "sibling", "inner"]);
    }

    #[test]
    fn tick_runs_exactly_one_task() {
        let queue = TaskQueue::new();
        let spawner = queue.spawner();
        let count = Rc::new(RefCell::new(0));
        for _ in 0..3 {
            let count = Rc::clone(&count);
            spawner.schedule(move || *count.borrow_mut() += 1);
        }
        assert!(queue.tick());
        assert_eq!(*count.borrow(), 1);
        assert_eq!(queue.len(), 2);
        queue.run();
        assert_eq!(*count.borrow(), 3);
        assert!(!queue.tick());
    }

    #[test]
    fn schedule_after_queue_dropped_is_a_no_op() {
        let spawner = {
            let queue = TaskQueue::new();
            queue.spawner()
        };
        // must not panic, and must drop the task rather than leak it
        let witness = Rc::new(());
        let held = Rc::clone(&witness);
        spawner.schedule(move || drop(held));
        assert_eq!(Rc::strong_count(&witness), 1);
    }
}
