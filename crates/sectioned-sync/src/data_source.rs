//! The caller-facing sectioned data source.
//!
//! [`SectionedDataSource`] owns both stores and both execution contexts:
//!
//! - the **canonical store**, mutated only on the mutation serializer, a
//!   dedicated [`SerialQueue`] worker,
//! - the **displayed snapshot**, mutated only by apply cycles running on the
//!   apply executor, and read by the renderer.
//!
//! Every edit entry point returns immediately. The edit runs later, in
//! submission order, against the then-current canonical store; addressing
//! that is out of range at that point drops the edit without any renderer
//! effect.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sectioned_sync::{
//!     BatchCompletion, Position, Renderer, RendererOperationSet, SectionedDataSource,
//! };
//! use sectioned_sync_core::ImmediateExecutor;
//!
//! struct Immediate;
//!
//! impl Renderer for Immediate {
//!     fn perform_batch_updates(&self, _ops: RendererOperationSet, completion: BatchCompletion) {
//!         completion.complete();
//!     }
//! }
//!
//! let source = SectionedDataSource::builder(Arc::new(Immediate))
//!     .seed(vec![vec![1, 2, 3]])
//!     .apply_executor(Arc::new(ImmediateExecutor))
//!     .build()
//!     .unwrap();
//!
//! source.append_item(0, 4);
//! source.delete_item(Position::new(0, 0));
//! assert!(source.wait_for_mutations());
//! assert_eq!(source.displayed_snapshot().into_inner(), vec![vec![2, 3, 4]]);
//! ```

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use sectioned_sync_core::logging::targets;
use sectioned_sync_core::{Executor, QueueResult, SerialQueue, SerialQueueBuilder, SerialQueueConfig};

use crate::change_log::ChangeLog;
use crate::edit::{Edit, EditKind};
use crate::error::{SectionsError, SectionsResult};
use crate::position::Position;
use crate::renderer::{CellProvider, Renderer};
use crate::scheduler::{ApplyScheduler, CycleSignals};
use crate::sections::Sections;

const APPLY_QUEUE_NAME: &str = "sectioned-sync-apply";

/// State shared with tasks running on the mutation serializer.
struct Shared<T> {
    canonical: RwLock<Sections<T>>,
    log: Arc<Mutex<ChangeLog<T>>>,
    scheduler: Arc<ApplyScheduler<T>>,
}

impl<T> Shared<T>
where
    T: Send + Sync + 'static,
{
    /// Runs one mutation turn: mutate the store, record the edit, wake the
    /// apply scheduler.
    fn run<F>(&self, kind: EditKind, mutate: F)
    where
        F: FnOnce(&mut Sections<T>) -> SectionsResult<Option<Edit<T>>>,
    {
        let edit = {
            let mut canonical = self.canonical.write();
            mutate(&mut canonical)
        };
        match edit {
            Ok(Some(edit)) => {
                tracing::trace!(target: targets::MUTATION, %kind, "edit recorded");
                self.log.lock().record(edit);
                self.scheduler.notify();
            }
            Ok(None) => {
                tracing::trace!(target: targets::MUTATION, %kind, "nothing to edit");
            }
            Err(err) => {
                tracing::debug!(target: targets::MUTATION, %kind, %err, "dropping out-of-range edit");
            }
        }
    }
}

/// A sectioned collection mutated asynchronously and displayed through
/// batch updates.
pub struct SectionedDataSource<T> {
    shared: Arc<Shared<T>>,
    displayed: Arc<RwLock<Sections<T>>>,
    serializer: SerialQueue,
}

impl<T> SectionedDataSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Starts building a data source that displays through `renderer`.
    pub fn builder(renderer: Arc<dyn Renderer>) -> SectionedDataSourceBuilder<T> {
        SectionedDataSourceBuilder::new(renderer)
    }

    fn submit<F>(&self, kind: EditKind, mutate: F)
    where
        F: FnOnce(&mut Sections<T>) -> SectionsResult<Option<Edit<T>>> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        if let Err(err) = self.serializer.submit(move || shared.run(kind, mutate)) {
            tracing::warn!(target: targets::MUTATION, %kind, %err, "mutation serializer rejected edit");
        }
    }

    // -------------------------------------------------------------------------
    // Section edits
    // -------------------------------------------------------------------------

    /// Appends an empty section.
    pub fn append_section(&self) {
        self.submit(EditKind::AppendSection, |store| {
            let section = store.append_section();
            Ok(Some(Edit::AppendSection { section }))
        });
    }

    /// Inserts an empty section at `section`.
    pub fn insert_section(&self, section: usize) {
        self.submit(EditKind::InsertSection, move |store| {
            store.insert_section(section)?;
            Ok(Some(Edit::InsertSection { section }))
        });
    }

    /// Deletes the section at `section` together with its items.
    pub fn delete_section(&self, section: usize) {
        self.submit(EditKind::DeleteSection, move |store| {
            store.remove_section(section)?;
            Ok(Some(Edit::DeleteSection { section }))
        });
    }

    // -------------------------------------------------------------------------
    // Item edits
    // -------------------------------------------------------------------------

    /// Appends `item` to the end of `section`.
    pub fn append_item(&self, section: usize, item: T) {
        self.submit(EditKind::AppendItem, move |store| {
            let position = store.append_item(section, item.clone())?;
            Ok(Some(Edit::AppendItem { item, position }))
        });
    }

    /// Appends `items` to the end of `section`, in order.
    pub fn append_items(&self, section: usize, items: Vec<T>) {
        self.submit(EditKind::AppendItems, move |store| {
            let start = store.check_section(section)?;
            if items.is_empty() {
                return Ok(None);
            }
            let positions = (start..start + items.len())
                .map(|item| Position::new(section, item))
                .collect();
            for item in &items {
                store.append_item(section, item.clone())?;
            }
            Ok(Some(Edit::AppendItems { items, positions }))
        });
    }

    /// Inserts `item` so that it sits at `position`.
    pub fn insert_item(&self, position: Position, item: T) {
        self.submit(EditKind::InsertItem, move |store| {
            store.insert_item(position, item.clone())?;
            Ok(Some(Edit::InsertItem { item, position }))
        });
    }

    /// Inserts several items at once.
    ///
    /// Each position is where its item sits once the whole insertion is
    /// done. The edit is dropped if any position is out of range, repeated,
    /// or if the lengths differ.
    pub fn insert_items(&self, items: Vec<T>, positions: Vec<Position>) {
        self.submit(EditKind::InsertItems, move |store| {
            if items.len() != positions.len() {
                return Err(SectionsError::LengthMismatch {
                    items: items.len(),
                    positions: positions.len(),
                });
            }
            let mut pairs: Vec<(Position, T)> = positions.into_iter().zip(items).collect();
            pairs.sort_by_key(|(position, _)| *position);
            check_final_insertions(store, &pairs)?;
            if pairs.is_empty() {
                return Ok(None);
            }

            let mut items = Vec::with_capacity(pairs.len());
            let mut positions = Vec::with_capacity(pairs.len());
            for (position, item) in pairs {
                store.insert_item(position, item.clone())?;
                items.push(item);
                positions.push(position);
            }
            Ok(Some(Edit::InsertItems { items, positions }))
        });
    }

    /// Deletes the item at `position`.
    pub fn delete_item(&self, position: Position) {
        self.submit(EditKind::DeleteItem, move |store| {
            store.remove_item(position)?;
            Ok(Some(Edit::DeleteItem { position }))
        });
    }

    /// Deletes several items at once.
    ///
    /// Positions address the section contents before the deletion. Repeats
    /// are ignored; the edit is dropped if any position is out of range.
    pub fn delete_items(&self, positions: Vec<Position>) {
        self.submit(EditKind::DeleteItems, move |store| delete_many(store, positions));
    }

    /// Deletes the items of `section` whose indices fall in `range`.
    pub fn delete_items_in(&self, section: usize, range: Range<usize>) {
        self.submit(EditKind::DeleteItems, move |store| {
            let positions = range.map(|item| Position::new(section, item)).collect();
            delete_many(store, positions)
        });
    }

    /// Deletes the last item of `section`.
    pub fn delete_last_item(&self, section: usize) {
        self.submit(EditKind::DeleteLastItem, move |store| {
            let (position, _) = store.remove_last_item(section)?;
            Ok(Some(Edit::DeleteLastItem { position }))
        });
    }

    /// Moves the item at `from` so that it ends up at `to`.
    ///
    /// `to` addresses the sections as they are once the item has been
    /// taken out.
    pub fn move_item(&self, from: Position, to: Position) {
        self.submit(EditKind::MoveItem, move |store| {
            store.move_item(from, to)?;
            Ok(Some(Edit::MoveItem { from, to }))
        });
    }

    // -------------------------------------------------------------------------
    // Data-dependent edits
    // -------------------------------------------------------------------------

    /// Inserts whatever `decide` returns, computed against the live canonical
    /// store inside the serializer's turn. `None` performs no edit.
    pub fn insert_with<F>(&self, decide: F)
    where
        F: FnOnce(&Sections<T>) -> Option<(T, Position)> + Send + 'static,
    {
        self.submit(EditKind::InsertItem, move |store| match decide(store) {
            Some((item, position)) => {
                store.insert_item(position, item.clone())?;
                Ok(Some(Edit::InsertItem { item, position }))
            }
            None => Ok(None),
        });
    }

    /// Deletes the position `decide` returns, computed against the live
    /// canonical store inside the serializer's turn. `None` performs no edit.
    pub fn delete_with<F>(&self, decide: F)
    where
        F: FnOnce(&Sections<T>) -> Option<Position> + Send + 'static,
    {
        self.submit(EditKind::DeleteItem, move |store| match decide(store) {
            Some(position) => {
                store.remove_item(position)?;
                Ok(Some(Edit::DeleteItem { position }))
            }
            None => Ok(None),
        });
    }

    // -------------------------------------------------------------------------
    // Renderer-side reads
    // -------------------------------------------------------------------------

    /// Number of sections the renderer currently shows.
    pub fn section_count(&self) -> usize {
        self.displayed.read().section_count()
    }

    /// Number of items the renderer currently shows in `section`, or zero if
    /// the section is not displayed.
    pub fn item_count(&self, section: usize) -> usize {
        self.displayed.read().item_count(section).unwrap_or(0)
    }

    /// Builds the element for the displayed item at `position`.
    pub fn element<E, P>(&self, provider: &P, position: Position) -> Option<E>
    where
        P: CellProvider<T, E> + ?Sized,
    {
        let displayed = self.displayed.read();
        displayed
            .get(position)
            .map(|item| provider.element(item, position))
    }

    /// A copy of what the renderer currently shows.
    pub fn displayed_snapshot(&self) -> Sections<T> {
        self.displayed.read().clone()
    }

    /// A copy of the canonical store as of the last completed mutation.
    pub fn canonical_snapshot(&self) -> Sections<T> {
        self.shared.canonical.read().clone()
    }

    // -------------------------------------------------------------------------
    // Lifecycle and observation
    // -------------------------------------------------------------------------

    /// Blocks until every edit submitted before this call has been applied
    /// to the canonical store.
    ///
    /// Returns `false` if the serializer is no longer running.
    pub fn wait_for_mutations(&self) -> bool {
        self.serializer.submit_sync(|| ()).is_ok()
    }

    /// Waits for pending mutations, then for the apply scheduler to go idle.
    ///
    /// Returns `true` if everything settled within `timeout`. Only
    /// meaningful when the apply executor runs tasks on its own.
    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        self.wait_for_mutations() && self.shared.scheduler.wait_idle(timeout)
    }

    /// Returns `true` while an apply cycle waits on the renderer.
    pub fn is_cycle_in_flight(&self) -> bool {
        self.shared.scheduler.is_cycle_in_flight()
    }

    /// Number of non-empty apply cycles completed so far.
    pub fn cycles_completed(&self) -> u64 {
        self.shared.scheduler.cycles_completed()
    }

    /// Signals emitted around apply cycles.
    pub fn signals(&self) -> &CycleSignals {
        self.shared.scheduler.signals()
    }

    /// Stops the mutation serializer after draining already submitted edits.
    ///
    /// Later edits are dropped.
    pub fn shutdown(&self) {
        self.serializer.stop_and_join();
    }
}

/// Checks ascending final positions against the store before any is applied.
fn check_final_insertions<T>(store: &Sections<T>, pairs: &[(Position, T)]) -> SectionsResult<()> {
    let mut previous: Option<Position> = None;
    let mut inserted = 0;
    for (position, _) in pairs {
        let count = store.check_section(position.section)?;
        if previous.is_some_and(|p| p.section != position.section) {
            inserted = 0;
        }
        if previous == Some(*position) || position.item > count + inserted {
            return Err(SectionsError::ItemOutOfRange {
                position: *position,
                count: count + inserted,
            });
        }
        inserted += 1;
        previous = Some(*position);
    }
    Ok(())
}

fn delete_many<T>(
    store: &mut Sections<T>,
    mut positions: Vec<Position>,
) -> SectionsResult<Option<Edit<T>>> {
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();
    for &position in &positions {
        store.check_item(position)?;
    }
    if positions.is_empty() {
        return Ok(None);
    }
    // Descending order keeps every remaining position valid.
    for &position in &positions {
        store.remove_item(position)?;
    }
    Ok(Some(Edit::DeleteItems { positions }))
}

/// Builder for [`SectionedDataSource`].
pub struct SectionedDataSourceBuilder<T> {
    renderer: Arc<dyn Renderer>,
    seed: Vec<Vec<T>>,
    mutation_queue: SerialQueueConfig,
    apply_executor: Option<Arc<dyn Executor>>,
    validate: bool,
}

impl<T> SectionedDataSourceBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            seed: Vec::new(),
            mutation_queue: SerialQueueConfig::default(),
            apply_executor: None,
            validate: cfg!(debug_assertions),
        }
    }

    /// Initial content of both the canonical store and the displayed snapshot.
    pub fn seed(mut self, sections: Vec<Vec<T>>) -> Self {
        self.seed = sections;
        self
    }

    /// Configuration of the mutation serializer's worker thread.
    pub fn mutation_queue(mut self, config: SerialQueueConfig) -> Self {
        self.mutation_queue = config;
        self
    }

    /// The renderer's execution context, where apply cycles run.
    ///
    /// Must run tasks one at a time in submission order. Defaults to a
    /// dedicated serial worker.
    pub fn apply_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.apply_executor = Some(executor);
        self
    }

    /// Check every operation set against the snapshot shapes before it is
    /// delivered. On by default in debug builds.
    pub fn validate_batches(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Starts the worker threads and builds the data source.
    pub fn build(self) -> QueueResult<SectionedDataSource<T>> {
        let serializer = SerialQueue::with_config(self.mutation_queue)?;
        let executor: Arc<dyn Executor> = match self.apply_executor {
            Some(executor) => executor,
            None => Arc::new(SerialQueueBuilder::new().name(APPLY_QUEUE_NAME).build()?),
        };

        let seed = Sections::from_sections(self.seed);
        let displayed = Arc::new(RwLock::new(seed.clone()));
        let log = Arc::new(Mutex::new(ChangeLog::new()));
        let scheduler = Arc::new(ApplyScheduler::new(
            Arc::clone(&log),
            Arc::clone(&displayed),
            executor,
            self.renderer,
            self.validate,
        ));

        tracing::debug!(
            target: targets::MUTATION,
            sections = seed.section_count(),
            items = seed.total_items(),
            serializer = serializer.name(),
            "sectioned data source created"
        );

        Ok(SectionedDataSource {
            shared: Arc::new(Shared {
                canonical: RwLock::new(seed),
                log,
                scheduler,
            }),
            displayed,
            serializer,
        })
    }
}

static_assertions::assert_impl_all!(SectionedDataSource<u32>: Send, Sync);
