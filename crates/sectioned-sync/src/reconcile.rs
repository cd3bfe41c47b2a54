//! Reconciliation of a change batch against the displayed snapshot.
//!
//! The engine replays a batch of logical edits, expressed in the canonical
//! store's index space at recording time, over a batch-local model of what
//! the renderer currently shows. Each section is modelled as a sequence of
//! runs:
//!
//! - `Existing(range)`: untouched displayed items, by original index,
//! - `Relocated(origin)`: a displayed item this batch moved, by original position,
//! - `Added(item)`: a pending addition that has never reached the renderer.
//!
//! Deleting an existing or relocated entry records a real deletion at its
//! original position; deleting a pending addition cancels it. Moving an entry
//! detaches and reattaches it, so existing items become relocated and
//! pending additions stay pending. Once the whole batch has been replayed,
//! walking the final runs yields the post-batch position of every insertion
//! and move destination.
//!
//! # Example
//!
//! ```
//! use sectioned_sync::{reconcile, Edit, Position};
//!
//! // The renderer shows one section of ten items.
//! let edits = vec![
//!     Edit::AppendItem { item: 10, position: Position::new(0, 10) },
//!     Edit::DeleteItem { position: Position::new(0, 0) },
//! ];
//! let reconciliation = reconcile(&[10], edits);
//! let ops = reconciliation.operations();
//! assert!(ops.deleted_items().contains(&Position::new(0, 0)));
//! assert!(ops.inserted_items().contains(&Position::new(0, 9)));
//! ```

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use sectioned_sync_core::PerfSpan;
use sectioned_sync_core::logging::targets;

use crate::edit::{Edit, Step};
use crate::error::{ReconcileError, SectionsError, SectionsResult};
use crate::operations::RendererOperationSet;
use crate::position::Position;
use crate::sections::Sections;

/// Where the value of an inserted item comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource<T> {
    /// An item added by the batch.
    New(T),
    /// An item the renderer already shows, re-entering through a
    /// delete-and-insert pair. The position is pre-batch.
    Displayed(Position),
}

/// The output of reconciling one batch.
#[derive(Debug, Clone)]
pub struct Reconciliation<T> {
    operations: RendererOperationSet,
    insertions: Vec<(Position, ItemSource<T>)>,
    cancelled: usize,
    dropped: usize,
}

impl<T> Reconciliation<T> {
    /// The renderer operations for this batch.
    pub fn operations(&self) -> &RendererOperationSet {
        &self.operations
    }

    /// Values for every inserted item, ordered by post-batch position.
    pub fn insertions(&self) -> &[(Position, ItemSource<T>)] {
        &self.insertions
    }

    /// Number of pending additions deleted again within the batch.
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Number of inconsistent edits dropped (release builds only).
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Returns `true` if the batch needs no renderer work.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Consumes the reconciliation, returning just the renderer operations.
    pub fn into_operations(self) -> RendererOperationSet {
        self.operations
    }

    /// Mutates `snapshot` into the post-batch state, in the order the
    /// renderer operations are presented, and returns the operations.
    ///
    /// Deletions and move sources are removed first (items descending, then
    /// sections descending), then sections are created and items inserted in
    /// ascending post-batch order.
    pub fn apply_to(self, snapshot: &mut Sections<T>) -> SectionsResult<RendererOperationSet> {
        let Self {
            operations,
            insertions,
            ..
        } = self;

        // Displayed items that outlive their removal: move sources and
        // delete-and-insert sources.
        let mut wanted: BTreeSet<Position> =
            operations.moved_items.iter().map(|&(from, _)| from).collect();
        for (_, source) in &insertions {
            if let ItemSource::Displayed(origin) = source {
                wanted.insert(*origin);
            }
        }

        let removals: BTreeSet<Position> = operations
            .deleted_items
            .iter()
            .copied()
            .chain(operations.moved_items.iter().map(|&(from, _)| from))
            .collect();
        let mut taken: HashMap<Position, T> = HashMap::with_capacity(wanted.len());
        for &position in removals.iter().rev() {
            let item = snapshot.remove_item(position)?;
            if wanted.contains(&position) {
                taken.insert(position, item);
            }
        }

        for &section in operations.deleted_sections.iter().rev() {
            let items = snapshot.remove_section(section)?;
            if wanted.range(Position::new(section, 0)..Position::new(section + 1, 0)).next().is_some() {
                for (index, item) in items.into_iter().enumerate() {
                    let position = Position::new(section, index);
                    if wanted.contains(&position) {
                        taken.insert(position, item);
                    }
                }
            }
        }

        for &section in &operations.inserted_sections {
            snapshot.insert_section(section)?;
        }

        let mut placements: Vec<(Position, ItemSource<T>)> = insertions;
        placements.extend(
            operations
                .moved_items
                .iter()
                .map(|&(from, to)| (to, ItemSource::Displayed(from))),
        );
        placements.sort_by_key(|(position, _)| *position);

        for (position, source) in placements {
            let item = match source {
                ItemSource::New(item) => item,
                ItemSource::Displayed(origin) => {
                    taken
                        .remove(&origin)
                        .ok_or(SectionsError::ItemOutOfRange {
                            position: origin,
                            count: 0,
                        })?
                }
            };
            snapshot.insert_item(position, item)?;
        }

        Ok(operations)
    }
}

/// Reconciles `edits` against a renderer showing sections with the given
/// item counts.
///
/// An edit that cannot be classified against the batch-local state is a
/// broken contract: it panics in debug builds and is logged and dropped in
/// release builds, with reconciliation continuing over the rest of the batch.
pub fn reconcile<T, I>(shape: &[usize], edits: I) -> Reconciliation<T>
where
    I: IntoIterator<Item = Edit<T>>,
{
    let _span = PerfSpan::new("reconcile");
    let mut reconciler = Reconciler::new(shape);
    for edit in edits {
        if let Err(err) = reconciler.apply(edit) {
            contract_violation(&err);
            reconciler.dropped += 1;
        }
    }
    reconciler.finish()
}

fn contract_violation(err: &ReconcileError) {
    if cfg!(debug_assertions) {
        panic!("reconciliation contract violated: {err}");
    }
    tracing::error!(target: targets::RECONCILE, %err, "dropping inconsistent edit");
}

enum Run<T> {
    Existing(Range<usize>),
    Relocated(Position),
    Added(T),
}

impl<T> Run<T> {
    fn len(&self) -> usize {
        match self {
            Self::Existing(range) => range.len(),
            Self::Relocated(_) | Self::Added(_) => 1,
        }
    }
}

/// An entry taken out of a section.
enum Entry<T> {
    Existing(Position),
    Relocated(Position),
    Added(T),
}

struct SectionSlot<T> {
    origin: Option<usize>,
    runs: Vec<Run<T>>,
    len: usize,
}

impl<T> SectionSlot<T> {
    fn displayed(origin: usize, count: usize) -> Self {
        let runs = if count > 0 {
            vec![Run::Existing(0..count)]
        } else {
            Vec::new()
        };
        Self {
            origin: Some(origin),
            runs,
            len: count,
        }
    }

    fn added() -> Self {
        Self {
            origin: None,
            runs: Vec::new(),
            len: 0,
        }
    }

    /// Splits runs so that one begins exactly at `index`, returning its run
    /// index (or `runs.len()` when `index == len`).
    fn split_at(&mut self, index: usize) -> usize {
        let mut start = 0;
        for run_index in 0..self.runs.len() {
            let run_len = self.runs[run_index].len();
            if index == start {
                return run_index;
            }
            if index < start + run_len {
                // Only multi-item runs can contain an interior index.
                if let Run::Existing(range) = &mut self.runs[run_index] {
                    let cut = range.start + (index - start);
                    let tail = cut..range.end;
                    range.end = cut;
                    self.runs.insert(run_index + 1, Run::Existing(tail));
                    return run_index + 1;
                }
            }
            start += run_len;
        }
        self.runs.len()
    }

    fn attach(&mut self, index: usize, run: Run<T>) {
        let run_index = self.split_at(index);
        self.runs.insert(run_index, run);
        self.len += 1;
    }

    fn detach(&mut self, index: usize) -> Entry<T> {
        let run_index = self.split_at(index);
        let entry = match self.runs.remove(run_index) {
            Run::Existing(range) => {
                if range.len() > 1 {
                    self.runs
                        .insert(run_index, Run::Existing(range.start + 1..range.end));
                }
                // Existing runs only live in displayed sections.
                Entry::Existing(Position::new(self.origin.unwrap_or_default(), range.start))
            }
            Run::Relocated(origin) => Entry::Relocated(origin),
            Run::Added(item) => Entry::Added(item),
        };
        self.len -= 1;
        entry
    }
}

/// Incremental reconciliation state for one batch.
struct Reconciler<T> {
    slots: Vec<SectionSlot<T>>,
    deleted_sections: BTreeSet<usize>,
    deleted_origins: Vec<Position>,
    cancelled: usize,
    dropped: usize,
}

impl<T> Reconciler<T> {
    fn new(shape: &[usize]) -> Self {
        Self {
            slots: shape
                .iter()
                .enumerate()
                .map(|(origin, &count)| SectionSlot::displayed(origin, count))
                .collect(),
            deleted_sections: BTreeSet::new(),
            deleted_origins: Vec::new(),
            cancelled: 0,
            dropped: 0,
        }
    }

    /// Replays one edit. On error, the state is left exactly as it was.
    fn apply(&mut self, edit: Edit<T>) -> Result<(), ReconcileError> {
        let kind = edit.kind();
        let steps = edit.into_steps().map_err(|source| ReconcileError { kind, source })?;
        self.check(&steps)
            .map_err(|source| ReconcileError { kind, source })?;

        for step in steps {
            self.step(step);
        }
        Ok(())
    }

    /// Validates a sequence of steps against the current shape without
    /// mutating anything.
    fn check(&self, steps: &[Step<T>]) -> SectionsResult<()> {
        let mut lens: Vec<usize> = self.slots.iter().map(|slot| slot.len).collect();

        let section_len = |lens: &[usize], section: usize| {
            lens.get(section)
                .copied()
                .ok_or(SectionsError::SectionOutOfRange {
                    section,
                    count: lens.len(),
                })
        };

        for step in steps {
            match step {
                Step::InsertSection(section) => {
                    if *section > lens.len() {
                        return Err(SectionsError::SectionOutOfRange {
                            section: *section,
                            count: lens.len(),
                        });
                    }
                    lens.insert(*section, 0);
                }
                Step::DeleteSection(section) => {
                    section_len(&lens, *section)?;
                    lens.remove(*section);
                }
                Step::InsertItem(position, _) => {
                    let count = section_len(&lens, position.section)?;
                    if position.item > count {
                        return Err(SectionsError::ItemOutOfRange {
                            position: *position,
                            count,
                        });
                    }
                    lens[position.section] += 1;
                }
                Step::DeleteItem(position) => {
                    let count = section_len(&lens, position.section)?;
                    if position.item >= count {
                        return Err(SectionsError::ItemOutOfRange {
                            position: *position,
                            count,
                        });
                    }
                    lens[position.section] -= 1;
                }
                Step::MoveItem { from, to } => {
                    let count = section_len(&lens, from.section)?;
                    if from.item >= count {
                        return Err(SectionsError::ItemOutOfRange {
                            position: *from,
                            count,
                        });
                    }
                    lens[from.section] -= 1;
                    let count = section_len(&lens, to.section)?;
                    if to.item > count {
                        return Err(SectionsError::ItemOutOfRange {
                            position: *to,
                            count,
                        });
                    }
                    lens[to.section] += 1;
                }
            }
        }
        Ok(())
    }

    /// Applies a step already validated by [`check`](Self::check).
    fn step(&mut self, step: Step<T>) {
        match step {
            Step::InsertSection(section) => {
                self.slots.insert(section, SectionSlot::added());
            }
            Step::DeleteSection(section) => {
                let slot = self.slots.remove(section);
                if let Some(origin) = slot.origin {
                    self.deleted_sections.insert(origin);
                }
                for run in slot.runs {
                    match run {
                        // Covered by the section deletion.
                        Run::Existing(_) => {}
                        Run::Relocated(origin) => self.deleted_origins.push(origin),
                        Run::Added(_) => self.cancelled += 1,
                    }
                }
            }
            Step::InsertItem(position, item) => {
                self.slots[position.section].attach(position.item, Run::Added(item));
            }
            Step::DeleteItem(position) => match self.slots[position.section].detach(position.item) {
                Entry::Existing(origin) | Entry::Relocated(origin) => {
                    self.deleted_origins.push(origin);
                }
                Entry::Added(_) => {
                    tracing::trace!(target: targets::RECONCILE, %position, "pending addition cancelled");
                    self.cancelled += 1;
                }
            },
            Step::MoveItem { from, to } => {
                if from == to {
                    return;
                }
                let run = match self.slots[from.section].detach(from.item) {
                    Entry::Existing(origin) | Entry::Relocated(origin) => Run::Relocated(origin),
                    Entry::Added(item) => Run::Added(item),
                };
                self.slots[to.section].attach(to.item, run);
            }
        }
    }

    fn finish(self) -> Reconciliation<T> {
        let Self {
            slots,
            deleted_sections,
            deleted_origins,
            cancelled,
            dropped,
        } = self;

        let mut operations = RendererOperationSet {
            deleted_sections,
            ..Default::default()
        };
        let mut insertions = Vec::new();

        for (section, slot) in slots.into_iter().enumerate() {
            let fresh = slot.origin.is_none();
            if fresh {
                operations.inserted_sections.insert(section);
            }

            let mut item = 0;
            for run in slot.runs {
                let position = Position::new(section, item);
                item += run.len();
                match run {
                    Run::Existing(_) => {}
                    Run::Added(value) => {
                        operations.inserted_items.insert(position);
                        insertions.push((position, ItemSource::New(value)));
                    }
                    Run::Relocated(origin) => {
                        let origin_deleted = operations.deleted_sections.contains(&origin.section);
                        if fresh || origin_deleted {
                            if !origin_deleted {
                                operations.deleted_items.insert(origin);
                            }
                            operations.inserted_items.insert(position);
                            insertions.push((position, ItemSource::Displayed(origin)));
                        } else {
                            operations.moved_items.push((origin, position));
                        }
                    }
                }
            }
        }

        for origin in deleted_origins {
            if !operations.deleted_sections.contains(&origin.section) {
                operations.deleted_items.insert(origin);
            }
        }

        tracing::debug!(
            target: targets::RECONCILE,
            operations = %operations,
            cancelled,
            dropped,
            "batch reconciled"
        );

        Reconciliation {
            operations,
            insertions,
            cancelled,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(section: usize, item: usize) -> Position {
        Position::new(section, item)
    }

    fn numbers(count: usize) -> Sections<usize> {
        Sections::from_sections(vec![(0..count).collect()])
    }

    /// Reconciles, applies to a copy of `displayed`, validates the operation
    /// set against both shapes and returns the applied snapshot and ops.
    fn run(
        displayed: &Sections<usize>,
        edits: Vec<Edit<usize>>,
    ) -> (Sections<usize>, RendererOperationSet) {
        let before = displayed.shape();
        let reconciliation = reconcile(&before, edits);
        let mut snapshot = displayed.clone();
        let ops = reconciliation.apply_to(&mut snapshot).unwrap();
        ops.validate(&before, &snapshot.shape()).unwrap();
        (snapshot, ops)
    }

    #[test]
    fn test_empty_batch() {
        let displayed = numbers(4);
        let (snapshot, ops) = run(&displayed, Vec::new());
        assert!(ops.is_empty());
        assert_eq!(snapshot, displayed);
    }

    #[test]
    fn test_append_then_delete_head() {
        let (snapshot, ops) = run(
            &numbers(10),
            vec![
                Edit::AppendItem {
                    item: 10,
                    position: pos(0, 10),
                },
                Edit::DeleteItem { position: pos(0, 0) },
            ],
        );
        assert_eq!(ops.deleted_items(), &BTreeSet::from([pos(0, 0)]));
        assert_eq!(ops.inserted_items(), &BTreeSet::from([pos(0, 9)]));
        assert_eq!(snapshot.section(0), Some(&(1..=10).collect::<Vec<_>>()[..]));
    }

    #[test]
    fn test_insert_then_delete_cancels() {
        let reconciliation = reconcile(
            &[3],
            vec![
                Edit::InsertItem {
                    item: 99,
                    position: pos(0, 1),
                },
                Edit::DeleteItem { position: pos(0, 1) },
            ],
        );
        assert!(reconciliation.is_empty());
        assert_eq!(reconciliation.cancelled(), 1);
    }

    #[test]
    fn test_repeated_second_to_last_deletes() {
        let displayed = numbers(11);
        let (snapshot, ops) = run(
            &displayed,
            vec![
                Edit::DeleteItem { position: pos(0, 9) },
                Edit::DeleteItem { position: pos(0, 8) },
                Edit::DeleteItem { position: pos(0, 7) },
                Edit::DeleteItem { position: pos(0, 0) },
            ],
        );
        assert_eq!(
            ops.deleted_items(),
            &BTreeSet::from([pos(0, 0), pos(0, 7), pos(0, 8), pos(0, 9)])
        );
        assert!(ops.inserted_items().is_empty());
        assert_eq!(snapshot.section(0), Some(&[1, 2, 3, 4, 5, 6, 10][..]));
    }

    #[test]
    fn test_section_then_item_into_it() {
        let displayed = Sections::new();
        let (snapshot, ops) = run(
            &displayed,
            vec![
                Edit::AppendSection { section: 0 },
                Edit::AppendItem {
                    item: 5,
                    position: pos(0, 0),
                },
            ],
        );
        assert_eq!(
            ops.steps(),
            vec![
                crate::RendererStep::InsertSection(0),
                crate::RendererStep::InsertItem(pos(0, 0)),
            ]
        );
        assert_eq!(snapshot.into_inner(), vec![vec![5]]);
    }

    #[test]
    fn test_inserts_into_existing_shift_later_pending() {
        // [0 1 2] -> append 3, then insert 9 at the head.
        let (snapshot, ops) = run(
            &numbers(3),
            vec![
                Edit::AppendItem {
                    item: 3,
                    position: pos(0, 3),
                },
                Edit::InsertItem {
                    item: 9,
                    position: pos(0, 0),
                },
            ],
        );
        assert_eq!(ops.inserted_items(), &BTreeSet::from([pos(0, 0), pos(0, 4)]));
        assert_eq!(snapshot.section(0), Some(&[9, 0, 1, 2, 3][..]));
    }

    #[test]
    fn test_bulk_deletes_mix_existing_and_pending() {
        // [0 1 2 3] -> append 4 and 5, then delete (sequentially) 5, 4, 1.
        let (snapshot, ops) = run(
            &numbers(4),
            vec![
                Edit::AppendItems {
                    items: vec![4, 5],
                    positions: vec![pos(0, 4), pos(0, 5)],
                },
                Edit::DeleteItems {
                    positions: vec![pos(0, 5), pos(0, 4), pos(0, 1)],
                },
            ],
        );
        assert_eq!(ops.deleted_items(), &BTreeSet::from([pos(0, 1)]));
        assert!(ops.inserted_items().is_empty());
        assert_eq!(snapshot.section(0), Some(&[0, 2, 3][..]));
    }

    #[test]
    fn test_delete_last_item_hits_pending_addition() {
        let reconciliation = reconcile(
            &[2],
            vec![
                Edit::AppendItem {
                    item: 7,
                    position: pos(0, 2),
                },
                Edit::DeleteLastItem { position: pos(0, 2) },
                Edit::DeleteLastItem { position: pos(0, 1) },
            ],
        );
        assert_eq!(reconciliation.cancelled(), 1);
        assert_eq!(
            reconciliation.operations().deleted_items(),
            &BTreeSet::from([pos(0, 1)])
        );
    }

    #[test]
    fn test_move_within_existing() {
        let (snapshot, ops) = run(
            &numbers(5),
            vec![Edit::MoveItem {
                from: pos(0, 0),
                to: pos(0, 4),
            }],
        );
        assert_eq!(ops.moved_items(), &[(pos(0, 0), pos(0, 4))]);
        assert!(ops.deleted_items().is_empty());
        assert_eq!(snapshot.section(0), Some(&[1, 2, 3, 4, 0][..]));
    }

    #[test]
    fn test_move_after_delete_uses_original_position() {
        // [0 1 2 3 4] -> delete 0, then move what is now at 0 (item 1) to the end.
        let (snapshot, ops) = run(
            &numbers(5),
            vec![
                Edit::DeleteItem { position: pos(0, 0) },
                Edit::MoveItem {
                    from: pos(0, 0),
                    to: pos(0, 3),
                },
            ],
        );
        assert_eq!(ops.deleted_items(), &BTreeSet::from([pos(0, 0)]));
        assert_eq!(ops.moved_items(), &[(pos(0, 1), pos(0, 3))]);
        assert_eq!(snapshot.section(0), Some(&[2, 3, 4, 1][..]));
    }

    #[test]
    fn test_move_of_pending_addition_needs_no_move() {
        let (snapshot, ops) = run(
            &numbers(3),
            vec![
                Edit::AppendItem {
                    item: 3,
                    position: pos(0, 3),
                },
                Edit::MoveItem {
                    from: pos(0, 3),
                    to: pos(0, 0),
                },
            ],
        );
        assert!(ops.moved_items().is_empty());
        assert_eq!(ops.inserted_items(), &BTreeSet::from([pos(0, 0)]));
        assert_eq!(snapshot.section(0), Some(&[3, 0, 1, 2][..]));
    }

    #[test]
    fn test_move_into_new_section_becomes_delete_insert() {
        let (snapshot, ops) = run(
            &numbers(3),
            vec![
                Edit::AppendSection { section: 1 },
                Edit::MoveItem {
                    from: pos(0, 1),
                    to: pos(1, 0),
                },
            ],
        );
        assert!(ops.moved_items().is_empty());
        assert_eq!(ops.inserted_sections(), &BTreeSet::from([1]));
        assert_eq!(ops.deleted_items(), &BTreeSet::from([pos(0, 1)]));
        assert_eq!(ops.inserted_items(), &BTreeSet::from([pos(1, 0)]));
        assert_eq!(snapshot.into_inner(), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_move_out_of_section_deleted_later() {
        let displayed = Sections::from_sections(vec![vec![0, 1], vec![2, 3]]);
        let (snapshot, ops) = run(
            &displayed,
            vec![
                Edit::MoveItem {
                    from: pos(0, 1),
                    to: pos(1, 0),
                },
                Edit::DeleteSection { section: 0 },
            ],
        );
        assert_eq!(ops.deleted_sections(), &BTreeSet::from([0]));
        assert!(ops.deleted_items().is_empty());
        assert!(ops.moved_items().is_empty());
        assert_eq!(ops.inserted_items(), &BTreeSet::from([pos(0, 0)]));
        assert_eq!(snapshot.into_inner(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_delete_section_with_relocated_and_pending_items() {
        let displayed = Sections::from_sections(vec![vec![0, 1, 2], vec![3]]);
        let (snapshot, ops) = run(
            &displayed,
            vec![
                Edit::MoveItem {
                    from: pos(0, 0),
                    to: pos(1, 1),
                },
                Edit::AppendItem {
                    item: 9,
                    position: pos(1, 2),
                },
                Edit::DeleteSection { section: 1 },
            ],
        );
        assert_eq!(ops.deleted_sections(), &BTreeSet::from([1]));
        assert_eq!(ops.deleted_items(), &BTreeSet::from([pos(0, 0)]));
        assert!(ops.inserted_items().is_empty());
        assert_eq!(snapshot.into_inner(), vec![vec![1, 2]]);
    }

    #[test]
    fn test_insert_section_before_existing_shifts_moves() {
        let displayed = Sections::from_sections(vec![vec![0, 1]]);
        let (snapshot, ops) = run(
            &displayed,
            vec![
                Edit::InsertSection { section: 0 },
                Edit::MoveItem {
                    from: pos(1, 0),
                    to: pos(1, 1),
                },
            ],
        );
        assert_eq!(ops.inserted_sections(), &BTreeSet::from([0]));
        assert_eq!(ops.moved_items(), &[(pos(0, 0), pos(1, 1))]);
        assert_eq!(snapshot.into_inner(), vec![vec![], vec![1, 0]]);
    }

    #[test]
    fn test_move_to_same_position_is_noop() {
        let reconciliation = reconcile(
            &[3],
            vec![Edit::<usize>::MoveItem {
                from: pos(0, 1),
                to: pos(0, 1),
            }],
        );
        assert!(reconciliation.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "reconciliation contract violated")]
    fn test_unclassifiable_delete_panics_in_debug() {
        reconcile::<usize, _>(&[2], vec![Edit::DeleteItem { position: pos(0, 5) }]);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_unclassifiable_delete_is_dropped_in_release() {
        let reconciliation = reconcile::<usize, _>(
            &[2],
            vec![
                Edit::DeleteItem { position: pos(0, 5) },
                Edit::DeleteItem { position: pos(0, 0) },
            ],
        );
        assert_eq!(reconciliation.dropped(), 1);
        assert_eq!(
            reconciliation.operations().deleted_items().iter().copied().collect::<Vec<_>>(),
            vec![pos(0, 0)]
        );
        assert!(reconciliation.operations().inserted_items().is_empty());
    }

    #[test]
    fn test_check_leaves_state_untouched_on_error() {
        let mut reconciler = Reconciler::<usize>::new(&[2]);
        let err = reconciler
            .apply(Edit::DeleteItems {
                positions: vec![pos(0, 1), pos(0, 1)],
            })
            .unwrap_err();
        assert_eq!(err.kind, crate::edit::EditKind::DeleteItems);
        assert!(reconciler.deleted_origins.is_empty());
        assert_eq!(reconciler.slots[0].len, 2);
    }
}
