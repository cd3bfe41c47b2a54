//! Execution contexts that work can be handed to.
//!
//! An [`Executor`] is the capability a component receives at construction to
//! run its work somewhere: a dedicated [`SerialQueue`](crate::SerialQueue), a
//! UI thread's event loop, or inline. Components never reach for an ambient
//! global queue.
//!
//! [`TaskQueue`] is a manually pumped FIFO: tasks accumulate until the owner
//! calls [`process_one`](TaskQueue::process_one) or
//! [`run_until_idle`](TaskQueue::run_until_idle), which makes it a stand-in
//! for a UI thread that drains its event queue once per frame.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::logging::targets;

/// A boxed unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs tasks.
///
/// Executors handed to a serialized component must run tasks one at a time
/// in submission order.
pub trait Executor: Send + Sync {
    /// Schedule `task` for execution.
    fn execute(&self, task: Task);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateExecutor;

impl Executor for ImmediateExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

/// A unique identifier for a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A thread-safe FIFO of tasks, drained explicitly by its owner.
///
/// Tasks are popped one at a time and run with the internal lock released,
/// so a running task may post further tasks.
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    /// Create a new task queue.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
        }
    }

    /// Post a task to run on the next drain.
    pub fn post<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = next_task_id();
        self.tasks.lock().push_back(Box::new(task));
        tracing::trace!(target: targets::EXECUTOR, task = id.as_u64(), "task posted");
        id
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Run the next pending task, if any.
    ///
    /// Returns `true` if a task ran.
    pub fn process_one(&self) -> bool {
        let next = self.tasks.lock().pop_front();
        match next {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks posted while
    /// draining.
    ///
    /// Returns the number of tasks processed.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.process_one() {
            count += 1;
        }
        count
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for TaskQueue {
    fn execute(&self, task: Task) {
        self.post(task);
    }
}

static_assertions::assert_impl_all!(TaskQueue: Send, Sync);
