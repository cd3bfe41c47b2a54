//! Execution-context primitives for sectioned-sync.
//!
//! This crate provides the building blocks the data source is wired from:
//!
//! - **Serial Queue**: a dedicated worker thread running tasks one at a time, in order
//! - **Executors**: the capability a component is handed to run its work somewhere,
//!   including a manually pumped [`TaskQueue`] and an inline [`ImmediateExecutor`]
//! - **Signals**: notifications delivered to connected slots on the emitting thread
//! - **Logging**: `tracing` targets and [`PerfSpan`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sectioned_sync_core::{Signal, TaskQueue};
//!
//! // A queue standing in for a UI thread's event loop
//! let ui = Arc::new(TaskQueue::new());
//!
//! let updated = Signal::<usize>::new();
//! let queue = ui.clone();
//! updated.connect(move |&count| {
//!     queue.post(move || println!("{count} items"));
//! });
//!
//! updated.emit(3);       // posted, nothing printed yet
//! ui.run_until_idle();   // prints "3 items"
//! ```

mod error;
pub mod executor;
pub mod logging;
pub mod serial_queue;
pub mod signal;

pub use error::{QueueError, QueueResult};
pub use executor::{Executor, ImmediateExecutor, Task, TaskId, TaskQueue};
pub use logging::PerfSpan;
pub use serial_queue::{SerialQueue, SerialQueueBuilder, SerialQueueConfig};
pub use signal::{ConnectionId, Signal};
