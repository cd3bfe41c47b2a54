//! Dedicated single-thread FIFO task queue.
//!
//! A `SerialQueue` owns one worker thread and an unbounded task channel.
//! Tasks run one at a time, strictly in submission order, regardless of how
//! many threads submit concurrently. This is the execution context used for
//! every mutation of a canonical store: no two tasks on the same queue ever
//! overlap.
//!
//! # Example
//!
//! ```no_run
//! use sectioned_sync_core::serial_queue::SerialQueue;
//!
//! let queue = SerialQueue::new().expect("spawn worker");
//!
//! // Fire-and-forget submission
//! queue.submit(|| println!("runs on the worker thread")).unwrap();
//!
//! // Blocking round trip
//! let answer = queue.submit_sync(|| 6 * 7).unwrap();
//! assert_eq!(answer, 42);
//!
//! queue.stop_and_join();
//! ```

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::{Condvar, Mutex};

use crate::error::{QueueError, QueueResult};
use crate::executor::{Executor, Task};
use crate::logging::targets;

/// Configuration for creating a `SerialQueue`.
#[derive(Debug, Clone)]
pub struct SerialQueueConfig {
    /// Name for the worker thread.
    pub name: String,
    /// Stack size for the worker thread in bytes. `None` uses the default.
    pub stack_size: Option<usize>,
}

impl Default for SerialQueueConfig {
    fn default() -> Self {
        Self {
            name: "sectioned-sync-serial".to_string(),
            stack_size: None,
        }
    }
}

impl SerialQueueConfig {
    /// Create a new configuration with the given thread name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builder for creating serial queues with custom configuration.
#[derive(Debug, Default)]
pub struct SerialQueueBuilder {
    config: SerialQueueConfig,
}

impl SerialQueueBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the stack size for the worker thread.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Build and start the queue.
    pub fn build(self) -> QueueResult<SerialQueue> {
        SerialQueue::with_config(self.config)
    }
}

/// State shared between the queue handle and its worker thread.
struct QueueState {
    running: AtomicBool,
    pending_tasks: AtomicUsize,
    worker_thread: OnceLock<ThreadId>,
    shutdown_condvar: Condvar,
    shutdown_mutex: Mutex<bool>,
}

impl QueueState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            pending_tasks: AtomicUsize::new(0),
            worker_thread: OnceLock::new(),
            shutdown_condvar: Condvar::new(),
            shutdown_mutex: Mutex::new(false),
        }
    }

    fn signal_shutdown(&self) {
        let mut exited = self.shutdown_mutex.lock();
        *exited = true;
        self.shutdown_condvar.notify_all();
    }
}

enum QueueMessage {
    Run(Task),
    Shutdown,
}

/// A dedicated worker thread processing tasks one at a time in FIFO order.
///
/// `SerialQueue` is `Send + Sync`; any number of threads may submit tasks.
/// Submission never blocks (the channel is unbounded), so a producer is
/// never stalled by a slow task.
pub struct SerialQueue {
    name: String,
    sender: Sender<QueueMessage>,
    handle: Mutex<Option<JoinHandle<()>>>,
    state: Arc<QueueState>,
}

impl SerialQueue {
    /// Create a queue with default configuration.
    ///
    /// The worker thread starts immediately.
    pub fn new() -> QueueResult<Self> {
        Self::with_config(SerialQueueConfig::default())
    }

    /// Create a queue with custom configuration.
    pub fn with_config(config: SerialQueueConfig) -> QueueResult<Self> {
        let (sender, receiver) = unbounded();
        let state = Arc::new(QueueState::new());
        let thread_state = state.clone();

        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || {
                let _ = thread_state.worker_thread.set(thread::current().id());
                queue_loop(&receiver, &thread_state);
                thread_state.running.store(false, Ordering::Release);
                thread_state.signal_shutdown();
            })
            .map_err(|err| QueueError::SpawnFailed {
                name: config.name.clone(),
                reason: err.to_string(),
            })?;

        // The thread id is also known from the handle; record it eagerly so
        // `is_current` is correct before the worker has been scheduled.
        let _ = state.worker_thread.set(handle.thread().id());

        tracing::debug!(target: targets::SERIAL_QUEUE, name = %config.name, "serial queue started");

        Ok(Self {
            name: config.name,
            sender,
            handle: Mutex::new(Some(handle)),
            state,
        })
    }

    /// The worker thread's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the queue still accepts tasks.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn pending_tasks(&self) -> usize {
        self.state.pending_tasks.load(Ordering::Acquire)
    }

    /// Returns `true` when called from this queue's worker thread.
    pub fn is_current(&self) -> bool {
        self.state.worker_thread.get() == Some(&thread::current().id())
    }

    /// Submit a task for execution after every previously submitted task.
    pub fn submit<F>(&self, task: F) -> QueueResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_running() {
            return Err(QueueError::Stopped {
                name: self.name.clone(),
            });
        }

        self.state.pending_tasks.fetch_add(1, Ordering::AcqRel);
        self.sender
            .send(QueueMessage::Run(Box::new(task)))
            .map_err(|_| {
                self.state.pending_tasks.fetch_sub(1, Ordering::AcqRel);
                QueueError::Disconnected {
                    name: self.name.clone(),
                }
            })
    }

    /// Submit a task and block until it has run, returning its result.
    ///
    /// Called from the worker thread itself, the task runs inline instead of
    /// deadlocking on its own queue.
    pub fn submit_sync<F, R>(&self, task: F) -> QueueResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(task());
        }

        let (result_sender, result_receiver) = bounded(1);
        self.submit(move || {
            let _ = result_sender.send(task());
        })?;

        result_receiver.recv().map_err(|_| QueueError::Disconnected {
            name: self.name.clone(),
        })
    }

    /// Request the queue to stop after draining every pending task.
    ///
    /// Non-blocking. New submissions are rejected from this point on.
    pub fn stop(&self) {
        if self.state.running.swap(false, Ordering::AcqRel) {
            tracing::debug!(target: targets::SERIAL_QUEUE, name = %self.name, "serial queue stopping");
        }
        let _ = self.sender.send(QueueMessage::Shutdown);
    }

    /// Wait for the worker thread to exit.
    ///
    /// Returns `true` if the thread was joined cleanly, `false` if it was
    /// already joined, panicked, or this is the worker thread itself.
    pub fn join(&self) -> bool {
        if self.is_current() {
            return false;
        }
        let mut handle = self.handle.lock();
        match handle.take() {
            Some(h) => h.join().is_ok(),
            None => false,
        }
    }

    /// Stop the queue and wait for it to finish.
    pub fn stop_and_join(&self) -> bool {
        self.stop();
        self.join()
    }

    /// Wait for the worker to exit, up to `timeout`.
    ///
    /// Returns `true` if the worker has exited.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut exited = self.state.shutdown_mutex.lock();
        if !*exited {
            self.state
                .shutdown_condvar
                .wait_for(&mut exited, timeout);
        }
        *exited
    }
}

impl Executor for SerialQueue {
    fn execute(&self, task: Task) {
        if let Err(err) = self.submit(task) {
            tracing::warn!(target: targets::SERIAL_QUEUE, %err, "dropping task submitted to stopped queue");
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        // Request shutdown without blocking.
        self.stop();
    }
}

static_assertions::assert_impl_all!(SerialQueue: Send, Sync);

fn queue_loop(receiver: &Receiver<QueueMessage>, state: &QueueState) {
    while let Ok(message) = receiver.recv() {
        match message {
            QueueMessage::Run(task) => {
                task();
                state.pending_tasks.fetch_sub(1, Ordering::AcqRel);
            }
            QueueMessage::Shutdown => {
                // Drain whatever was accepted before the stop request.
                while let Ok(message) = receiver.try_recv() {
                    if let QueueMessage::Run(task) = message {
                        task();
                        state.pending_tasks.fetch_sub(1, Ordering::AcqRel);
                    }
                }
                break;
            }
        }
    }
}
