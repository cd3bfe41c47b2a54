//! Logging facilities for sectioned-sync.
//!
//! Everything is instrumented with the `tracing` crate. Install a subscriber
//! in the host application to see output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("sectioned_sync=debug,sectioned_sync_core=info")
//!     .init();
//! ```
//!
//! The [`targets`] module lists one target per subsystem for filtering.

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "sectioned_sync_core";
    /// Serial worker queue target.
    pub const SERIAL_QUEUE: &str = "sectioned_sync_core::serial_queue";
    /// Executor and task queue target.
    pub const EXECUTOR: &str = "sectioned_sync_core::executor";
    /// Signal/slot target.
    pub const SIGNAL: &str = "sectioned_sync_core::signal";
    /// Mutation serializer target.
    pub const MUTATION: &str = "sectioned_sync::mutation";
    /// Reconciliation engine target.
    pub const RECONCILE: &str = "sectioned_sync::reconcile";
    /// Apply scheduler target.
    pub const APPLY: &str = "sectioned_sync::apply";
    /// Performance spans.
    pub const PERF: &str = "sectioned_sync::perf";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for tracking the duration of an operation.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
