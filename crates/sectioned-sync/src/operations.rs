//! The operation set a renderer applies as one atomic batch update.
//!
//! Index spaces follow the conventional batch-update contract:
//!
//! - section and item **deletions** and move **sources** address the
//!   displayed snapshot as it was *before* the batch,
//! - section and item **insertions** and move **destinations** address it
//!   as it is *after* the batch.
//!
//! Items inside a deleted section are never listed individually. A newly
//! inserted section arrives empty and its items are listed as item
//! insertions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::InconsistentUpdate;
use crate::position::Position;

/// One renderer-facing operation, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererStep {
    DeleteItem(Position),
    DeleteSection(usize),
    InsertSection(usize),
    InsertItem(Position),
    MoveItem { from: Position, to: Position },
}

/// Disjoint sets of section and item operations for one batch update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererOperationSet {
    pub(crate) deleted_sections: BTreeSet<usize>,
    pub(crate) inserted_sections: BTreeSet<usize>,
    pub(crate) deleted_items: BTreeSet<Position>,
    pub(crate) inserted_items: BTreeSet<Position>,
    pub(crate) moved_items: Vec<(Position, Position)>,
}

impl RendererOperationSet {
    /// Creates an empty operation set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sections to delete, in pre-batch indices.
    pub fn deleted_sections(&self) -> &BTreeSet<usize> {
        &self.deleted_sections
    }

    /// Sections to insert, in post-batch indices.
    pub fn inserted_sections(&self) -> &BTreeSet<usize> {
        &self.inserted_sections
    }

    /// Items to delete, in pre-batch positions.
    pub fn deleted_items(&self) -> &BTreeSet<Position> {
        &self.deleted_items
    }

    /// Items to insert, in post-batch positions.
    pub fn inserted_items(&self) -> &BTreeSet<Position> {
        &self.inserted_items
    }

    /// Items to move, as (pre-batch source, post-batch destination) pairs
    /// ordered by destination.
    pub fn moved_items(&self) -> &[(Position, Position)] {
        &self.moved_items
    }

    /// Returns `true` if there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.deleted_sections.len()
            + self.inserted_sections.len()
            + self.deleted_items.len()
            + self.inserted_items.len()
            + self.moved_items.len()
    }

    /// The operations in presentation order: item deletions (descending),
    /// section deletions (descending), section insertions (ascending), item
    /// insertions (ascending), then moves.
    ///
    /// Sections are always created or removed before any item operation that
    /// lands inside them.
    pub fn steps(&self) -> Vec<RendererStep> {
        let mut steps = Vec::with_capacity(self.len());
        steps.extend(self.deleted_items.iter().rev().copied().map(RendererStep::DeleteItem));
        steps.extend(
            self.deleted_sections
                .iter()
                .rev()
                .copied()
                .map(RendererStep::DeleteSection),
        );
        steps.extend(
            self.inserted_sections
                .iter()
                .copied()
                .map(RendererStep::InsertSection),
        );
        steps.extend(self.inserted_items.iter().copied().map(RendererStep::InsertItem));
        steps.extend(
            self.moved_items
                .iter()
                .map(|&(from, to)| RendererStep::MoveItem { from, to }),
        );
        steps
    }

    /// Checks that applying this set to a renderer showing `before` yields a
    /// renderer showing `after`, the way a list or grid view would verify a
    /// batch update.
    ///
    /// `before` and `after` are per-section item counts.
    pub fn validate(&self, before: &[usize], after: &[usize]) -> Result<(), InconsistentUpdate> {
        let expected_sections =
            (before.len() + self.inserted_sections.len()).checked_sub(self.deleted_sections.len());
        if expected_sections != Some(after.len()) {
            return Err(InconsistentUpdate::SectionCount {
                before: before.len(),
                after: after.len(),
                inserted: self.inserted_sections.len(),
                deleted: self.deleted_sections.len(),
            });
        }
        if let Some(&section) = self.deleted_sections.iter().find(|&&s| s >= before.len()) {
            return Err(InconsistentUpdate::SectionOutOfRange { section });
        }
        if let Some(&section) = self.inserted_sections.iter().find(|&&s| s >= after.len()) {
            return Err(InconsistentUpdate::SectionOutOfRange { section });
        }

        let check_source = |position: Position| {
            let valid = position.section < before.len()
                && !self.deleted_sections.contains(&position.section)
                && position.item < before[position.section];
            if valid {
                Ok(())
            } else {
                Err(InconsistentUpdate::ItemOutOfRange { position })
            }
        };
        let check_destination = |position: Position| {
            if position.section < after.len() && position.item < after[position.section] {
                Ok(())
            } else {
                Err(InconsistentUpdate::ItemOutOfRange { position })
            }
        };

        let mut removed_from: BTreeMap<usize, usize> = BTreeMap::new();
        let mut added_to: BTreeMap<usize, usize> = BTreeMap::new();
        let mut sources = BTreeSet::new();
        let mut destinations = BTreeSet::new();

        for &position in &self.deleted_items {
            check_source(position)?;
            sources.insert(position);
            *removed_from.entry(position.section).or_default() += 1;
        }
        for &position in &self.inserted_items {
            check_destination(position)?;
            destinations.insert(position);
            *added_to.entry(position.section).or_default() += 1;
        }
        for &(from, to) in &self.moved_items {
            check_source(from)?;
            check_destination(to)?;
            if self.inserted_sections.contains(&to.section) {
                return Err(InconsistentUpdate::MoveIntoNewSection { from, to });
            }
            if !sources.insert(from) || !destinations.insert(to) {
                return Err(InconsistentUpdate::Duplicate { from, to });
            }
            *removed_from.entry(from.section).or_default() += 1;
            *added_to.entry(to.section).or_default() += 1;
        }

        // Surviving pre-batch sections fill the post-batch slots that are not
        // newly inserted, in order.
        let mut survivors = (0..before.len()).filter(|s| !self.deleted_sections.contains(s));
        for (section, &count) in after.iter().enumerate() {
            let added = added_to.get(&section).copied().unwrap_or(0);
            let expected = if self.inserted_sections.contains(&section) {
                Some(added)
            } else {
                survivors.next().and_then(|origin| {
                    let removed = removed_from.get(&origin).copied().unwrap_or(0);
                    (before[origin] + added).checked_sub(removed)
                })
            };
            if expected != Some(count) {
                return Err(InconsistentUpdate::ItemCount {
                    section,
                    expected,
                    actual: count,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for RendererOperationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{} sections +{} sections -{} items +{} items ~{} moves",
            self.deleted_sections.len(),
            self.inserted_sections.len(),
            self.deleted_items.len(),
            self.inserted_items.len(),
            self.moved_items.len()
        )
    }
}
