//! FIFO queue of suspendable exchange tasks.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::cell::RefCell;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Waker};

/// One enqueued exchange.
///
/// The future slot is taken while the task body runs so the queue stays
/// borrowable from inside the task (a running exchange may enqueue
/// follow-up work behind itself).
struct Task {
    future: Option<Pin<Box<dyn Future<Output = ()>>>>,
}

/// Strictly ordered cooperative task queue.
///
/// At most one task is active at any instant: the head of the queue. A
/// task enqueued behind another does not start until everything before it
/// has completed, so the serial line always has a single owner and tasks
/// never interleave. Suspended state lives in the task's pinned future;
/// resuming it replays nothing and loses nothing.
///
/// There is no depth limit and no cancellation: an enqueued task runs to
/// completion or waits forever for bytes that never arrive. [`Self::len`]
/// lets the host watch backlog growth.
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: RefCell::new(VecDeque::new()),
        }
    }

    /// Append a task.
    ///
    /// A task entering an empty queue starts synchronously inside this
    /// call and runs until its first suspension. If it completes without
    /// suspending, any work it enqueued behind itself is advanced before
    /// this call returns.
    pub fn enqueue(&self, future: impl Future<Output = ()> + 'static) {
        let was_idle = {
            let mut tasks = self.tasks.borrow_mut();
            let was_idle = tasks.is_empty();
            tasks.push_back(Task {
                future: Some(Box::pin(future)),
            });
            was_idle
        };

        if was_idle {
            self.poll();
        }
    }

    /// Resume the head task and advance through completed tasks.
    ///
    /// Stops at the first task that suspends again (the cooperative tick
    /// boundary) or when the queue drains.
    pub fn poll(&self) {
        loop {
            let mut future = {
                let mut tasks = self.tasks.borrow_mut();
                match tasks.front_mut().and_then(|task| task.future.take()) {
                    Some(future) => future,
                    // Empty queue, or the head is already running further
                    // up this call stack.
                    None => return,
                }
            };

            let mut cx = Context::from_waker(Waker::noop());
            let finished = future.as_mut().poll(&mut cx).is_ready();

            let mut tasks = self.tasks.borrow_mut();
            if finished {
                tasks.pop_front();
            } else {
                if let Some(head) = tasks.front_mut() {
                    head.future = Some(future);
                }
                return;
            }
        }
    }

    /// True when no task is enqueued or running.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Number of tasks waiting or running.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
