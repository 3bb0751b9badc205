//! Single-threaded cooperative event loop with a virtual clock.
//!
//! Stands in for the browser's task queue. Nothing in the crate blocks:
//! image preloads, fade delays and banner timeouts are all continuations
//! queued here. Tasks run ordered by due time, then by submission order, so a
//! run is fully deterministic.
//!
//! [`Scheduler`] is a cheap cloneable handle; all clones share one queue.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::rc::Rc;
use std::time::Duration;

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queue {
    now: Duration,
    next_seq: u64,
    order: BinaryHeap<Reverse<(Duration, u64)>>,
    tasks: BTreeMap<u64, Task>,
}

#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<Queue>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` on a later turn, without advancing the clock.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.after(Duration::ZERO, task);
    }

    /// Run `task` once `delay` has elapsed on the virtual clock.
    pub fn after(&self, delay: Duration, task: impl FnOnce() + 'static) {
        let mut queue = self.queue.borrow_mut();
        let due = queue.now + delay;
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.order.push(Reverse((due, seq)));
        queue.tasks.insert(seq, Box::new(task));
    }

    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().tasks.len()
    }

    /// Run the single next task, advancing the clock to its due time.
    ///
    /// Returns `false` when the queue is empty.
    pub fn step(&self) -> bool {
        // The borrow must end before the task runs: tasks schedule more tasks.
        let task = {
            let mut queue = self.queue.borrow_mut();
            let Some(Reverse((due, seq))) = queue.order.pop() else {
                return false;
            };
            queue.now = queue.now.max(due);
            queue.tasks.remove(&seq)
        };
        if let Some(task) = task {
            task();
        }
        true
    }

    /// Drain the queue, including tasks scheduled while draining.
    ///
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.step() {
            ran += 1;
        }
        ran
    }

    /// Run every task due within `duration` from now, then set the clock to
    /// exactly that point.
    pub fn advance(&self, duration: Duration) -> usize {
        let deadline = self.now() + duration;
        let mut ran = 0;
        loop {
            let next_due = self
                .queue
                .borrow()
                .order
                .peek()
                .map(|Reverse((due, _))| *due);
            match next_due {
                Some(due) if due <= deadline => {
                    self.step();
                    ran += 1;
                }
                _ => break,
            }
        }
        let mut queue = self.queue.borrow_mut();
        queue.now = queue.now.max(deadline);
        ran
    }
}
