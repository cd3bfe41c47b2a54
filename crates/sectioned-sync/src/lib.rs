//! Asynchronous edits of a sectioned collection, delivered to a renderer as
//! index-consistent batch updates.
//!
//! A producer mutates a [`SectionedDataSource`] from any thread. Edits run
//! in order on a dedicated mutation serializer against the always-current
//! canonical store and are recorded in a change log. The renderer lags
//! behind: whenever no batch is in flight, the apply scheduler swaps out the
//! log, reconciles it against the displayed snapshot with [`reconcile()`],
//! updates that snapshot and hands the renderer one [`RendererOperationSet`].
//!
//! # Modules
//!
//! - [`sections`]: the sectioned sequence used for both stores
//! - [`edit`] and [`change_log`]: logical edits and their buffer
//! - [`reconcile`] and [`operations`]: batch translation and its output
//! - [`renderer`]: the renderer and cell-provider capabilities
//! - [`data_source`]: the caller-facing API
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sectioned_sync::{
//!     BatchCompletion, Position, Renderer, RendererOperationSet, SectionedDataSource,
//! };
//! use sectioned_sync_core::TaskQueue;
//!
//! struct Log;
//!
//! impl Renderer for Log {
//!     fn perform_batch_updates(&self, ops: RendererOperationSet, completion: BatchCompletion) {
//!         println!("batch {}: {ops}", completion.sequence());
//!         completion.complete();
//!     }
//! }
//!
//! // The renderer's thread, pumped manually here.
//! let ui = Arc::new(TaskQueue::new());
//! let source = SectionedDataSource::builder(Arc::new(Log))
//!     .seed(vec![(0..10).collect::<Vec<u32>>()])
//!     .apply_executor(ui.clone())
//!     .build()
//!     .unwrap();
//!
//! source.append_item(0, 10);
//! source.delete_item(Position::new(0, 0));
//! source.wait_for_mutations();
//! ui.run_until_idle();
//!
//! assert_eq!(source.item_count(0), 10);
//! assert_eq!(source.displayed_snapshot().section(0).unwrap()[9], 10);
//! ```

pub mod change_log;
pub mod data_source;
pub mod edit;
mod error;
pub mod operations;
pub mod position;
pub mod reconcile;
pub mod renderer;
mod scheduler;
pub mod sections;

pub use change_log::{ChangeBatch, ChangeLog};
pub use data_source::{SectionedDataSource, SectionedDataSourceBuilder};
pub use edit::{Edit, EditKind, Step};
pub use error::{InconsistentUpdate, ReconcileError, SectionsError, SectionsResult};
pub use operations::{RendererOperationSet, RendererStep};
pub use position::Position;
pub use reconcile::{ItemSource, Reconciliation, reconcile};
pub use renderer::{BatchCompletion, CellProvider, Renderer};
pub use scheduler::{CycleReport, CycleSignals};
pub use sections::Sections;
