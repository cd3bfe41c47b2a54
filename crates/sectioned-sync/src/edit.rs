//! Logical edits recorded by the mutation serializer.
//!
//! Every edit carries positions in the canonical store's index space at the
//! moment it was recorded, self-consistent with the store mutation that
//! produced it:
//!
//! - insert positions are where the item sits right after insertion,
//! - delete positions are where the item sat right before removal,
//! - bulk positions are sequential: entry `i` is valid once entries `0..i`
//!   of the same edit have been applied.

use std::fmt;

use crate::error::{SectionsError, SectionsResult};
use crate::position::Position;

/// One caller-intended mutation of the canonical store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<T> {
    /// An empty section was appended at index `section`.
    AppendSection { section: usize },
    /// An empty section was inserted at index `section`.
    InsertSection { section: usize },
    /// The section at index `section` was removed along with its items.
    DeleteSection { section: usize },
    /// `item` was appended, landing at `position`.
    AppendItem { item: T, position: Position },
    /// `items` were appended in order, landing at `positions`.
    AppendItems { items: Vec<T>, positions: Vec<Position> },
    /// `item` was inserted at `position`.
    InsertItem { item: T, position: Position },
    /// `items` were inserted one after another at `positions`.
    InsertItems { items: Vec<T>, positions: Vec<Position> },
    /// The item at `position` was removed.
    DeleteItem { position: Position },
    /// Items were removed one after another at `positions`.
    DeleteItems { positions: Vec<Position> },
    /// The last item of a section, at `position`, was removed.
    DeleteLastItem { position: Position },
    /// The item at `from` was moved so that it now sits at `to`.
    MoveItem { from: Position, to: Position },
}

/// The variant of an [`Edit`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    AppendSection,
    InsertSection,
    DeleteSection,
    AppendItem,
    AppendItems,
    InsertItem,
    InsertItems,
    DeleteItem,
    DeleteItems,
    DeleteLastItem,
    MoveItem,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single-item primitive that every [`Edit`] decomposes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    InsertSection(usize),
    DeleteSection(usize),
    InsertItem(Position, T),
    DeleteItem(Position),
    MoveItem { from: Position, to: Position },
}

impl<T> Edit<T> {
    /// Returns the kind of this edit.
    pub fn kind(&self) -> EditKind {
        match self {
            Self::AppendSection { .. } => EditKind::AppendSection,
            Self::InsertSection { .. } => EditKind::InsertSection,
            Self::DeleteSection { .. } => EditKind::DeleteSection,
            Self::AppendItem { .. } => EditKind::AppendItem,
            Self::AppendItems { .. } => EditKind::AppendItems,
            Self::InsertItem { .. } => EditKind::InsertItem,
            Self::InsertItems { .. } => EditKind::InsertItems,
            Self::DeleteItem { .. } => EditKind::DeleteItem,
            Self::DeleteItems { .. } => EditKind::DeleteItems,
            Self::DeleteLastItem { .. } => EditKind::DeleteLastItem,
            Self::MoveItem { .. } => EditKind::MoveItem,
        }
    }

    /// Decomposes the edit into single-item steps, in application order.
    ///
    /// Fails only when a bulk edit carries a different number of items and
    /// positions.
    pub fn into_steps(self) -> SectionsResult<Vec<Step<T>>> {
        let steps = match self {
            Self::AppendSection { section } | Self::InsertSection { section } => {
                vec![Step::InsertSection(section)]
            }
            Self::DeleteSection { section } => vec![Step::DeleteSection(section)],
            Self::AppendItem { item, position } | Self::InsertItem { item, position } => {
                vec![Step::InsertItem(position, item)]
            }
            Self::AppendItems { items, positions } | Self::InsertItems { items, positions } => {
                if items.len() != positions.len() {
                    return Err(SectionsError::LengthMismatch {
                        items: items.len(),
                        positions: positions.len(),
                    });
                }
                positions
                    .into_iter()
                    .zip(items)
                    .map(|(position, item)| Step::InsertItem(position, item))
                    .collect()
            }
            Self::DeleteItem { position } | Self::DeleteLastItem { position } => {
                vec![Step::DeleteItem(position)]
            }
            Self::DeleteItems { positions } => {
                positions.into_iter().map(Step::DeleteItem).collect()
            }
            Self::MoveItem { from, to } => vec![Step::MoveItem { from, to }],
        };
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        let edit = Edit::InsertItem {
            item: 'a',
            position: Position::new(0, 0),
        };
        assert_eq!(edit.kind(), EditKind::InsertItem);
        assert_eq!(EditKind::DeleteLastItem.to_string(), "DeleteLastItem");
    }

    #[test]
    fn test_bulk_insert_decomposes_in_order() {
        let edit = Edit::InsertItems {
            items: vec!['a', 'b'],
            positions: vec![Position::new(0, 1), Position::new(0, 4)],
        };
        assert_eq!(
            edit.into_steps().unwrap(),
            vec![
                Step::InsertItem(Position::new(0, 1), 'a'),
                Step::InsertItem(Position::new(0, 4), 'b'),
            ]
        );
    }

    #[test]
    fn test_bulk_length_mismatch() {
        let edit = Edit::AppendItems {
            items: vec![1, 2, 3],
            positions: vec![Position::new(0, 0)],
        };
        assert_eq!(
            edit.into_steps(),
            Err(SectionsError::LengthMismatch {
                items: 3,
                positions: 1
            })
        );
    }

    #[test]
    fn test_section_and_delete_steps() {
        assert_eq!(
            Edit::<u8>::AppendSection { section: 2 }.into_steps().unwrap(),
            vec![Step::InsertSection(2)]
        );
        assert_eq!(
            Edit::<u8>::DeleteItems {
                positions: vec![Position::new(0, 3), Position::new(0, 1)]
            }
            .into_steps()
            .unwrap(),
            vec![
                Step::DeleteItem(Position::new(0, 3)),
                Step::DeleteItem(Position::new(0, 1)),
            ]
        );
    }
}
