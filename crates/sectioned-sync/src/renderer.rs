//! Collaborator traits for the view that displays a sectioned sequence.
//!
//! The data source owns two external collaborators:
//!
//! - a [`Renderer`], which receives one [`RendererOperationSet`] per apply
//!   cycle and reports back through a [`BatchCompletion`] once it has
//!   finished animating or otherwise applying it,
//! - a [`CellProvider`], which turns an item of the displayed snapshot into
//!   whatever the view presents at a position.
//!
//! # Example
//!
//! ```
//! use sectioned_sync::{BatchCompletion, Renderer, RendererOperationSet};
//!
//! struct Immediate;
//!
//! impl Renderer for Immediate {
//!     fn perform_batch_updates(&self, operations: RendererOperationSet, completion: BatchCompletion) {
//!         println!("applying {operations}");
//!         completion.complete();
//!     }
//! }
//! ```

use std::fmt;

use sectioned_sync_core::logging::targets;

use crate::operations::RendererOperationSet;
use crate::position::Position;

/// A view that applies batch updates.
///
/// Called on the apply executor. Implementations must eventually call
/// [`BatchCompletion::complete`], possibly from another thread; until they
/// do, no further batch is delivered.
pub trait Renderer: Send + Sync {
    /// Applies `operations` atomically and signals `completion` when done.
    fn perform_batch_updates(&self, operations: RendererOperationSet, completion: BatchCompletion);
}

/// Produces the presented element for an item.
///
/// Only ever handed items from the displayed snapshot.
pub trait CellProvider<T, E> {
    /// Builds the element for `item`, currently displayed at `position`.
    fn element(&self, item: &T, position: Position) -> E;
}

impl<T, E, F> CellProvider<T, E> for F
where
    F: Fn(&T, Position) -> E,
{
    fn element(&self, item: &T, position: Position) -> E {
        self(item, position)
    }
}

type CompletionFn = Box<dyn FnOnce() + Send + 'static>;

/// One-shot completion handle for a single batch update.
///
/// Dropping the handle without calling [`complete`](Self::complete) leaves
/// the apply cycle in flight, so no later batch is ever delivered.
#[must_use = "the apply cycle stalls until the batch completion is signalled"]
pub struct BatchCompletion {
    sequence: u64,
    on_complete: Option<CompletionFn>,
}

impl BatchCompletion {
    /// Creates a completion that runs `on_complete` once.
    pub fn new<F>(sequence: u64, on_complete: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            sequence,
            on_complete: Some(Box::new(on_complete)),
        }
    }

    /// The sequence number of the batch this handle completes.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Signals that the renderer has finished applying the batch.
    pub fn complete(mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
    }
}

impl Drop for BatchCompletion {
    fn drop(&mut self) {
        if self.on_complete.is_some() {
            tracing::warn!(
                target: targets::APPLY,
                sequence = self.sequence,
                "batch completion dropped without completing; apply cycle stalled"
            );
        }
    }
}

impl fmt::Debug for BatchCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchCompletion")
            .field("sequence", &self.sequence)
            .field("pending", &self.on_complete.is_some())
            .finish()
    }
}

static_assertions::assert_impl_all!(BatchCompletion: Send);
