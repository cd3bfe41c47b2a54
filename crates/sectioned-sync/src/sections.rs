//! Sectioned sequences of items.
//!
//! `Sections<T>` is the storage type behind both the canonical item store and
//! the displayed snapshot: an ordered list of sections, each an ordered list
//! of items. Every mutator validates its addressing up front and reports
//! failures as [`SectionsError`] without touching the sequence.

use crate::error::{SectionsError, SectionsResult};
use crate::position::Position;

/// An ordered sequence of sections, each holding an ordered sequence of items.
///
/// The item type is opaque; `Sections` never inspects item contents.
///
/// # Example
///
/// ```
/// use sectioned_sync::{Position, Sections};
///
/// let mut sections = Sections::from_sections(vec![vec!["a", "b"]]);
/// sections.insert_item(Position::new(0, 1), "x").unwrap();
/// assert_eq!(sections.section(0), Some(&["a", "x", "b"][..]));
/// assert!(sections.remove_item(Position::new(0, 9)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections<T> {
    sections: Vec<Vec<T>>,
}

impl<T> Default for Sections<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<Vec<T>>> for Sections<T> {
    fn from(sections: Vec<Vec<T>>) -> Self {
        Self::from_sections(sections)
    }
}

impl<T> Sections<T> {
    /// Creates an empty sequence with no sections.
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Creates a sequence pre-seeded with the given sections.
    pub fn from_sections(sections: Vec<Vec<T>>) -> Self {
        Self { sections }
    }

    /// Returns the number of sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Returns `true` if there are no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Returns the number of items in `section`, or `None` if it does not exist.
    pub fn item_count(&self, section: usize) -> Option<usize> {
        self.sections.get(section).map(Vec::len)
    }

    /// Returns the number of items across all sections.
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(Vec::len).sum()
    }

    /// Returns the item at `position`.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.sections
            .get(position.section)
            .and_then(|items| items.get(position.item))
    }

    /// Returns the items of `section`.
    pub fn section(&self, section: usize) -> Option<&[T]> {
        self.sections.get(section).map(Vec::as_slice)
    }

    /// Returns the item count of every section, in order.
    pub fn shape(&self) -> Vec<usize> {
        self.sections.iter().map(Vec::len).collect()
    }

    /// Iterates over the sections.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.sections.iter().map(Vec::as_slice)
    }

    /// Consumes the sequence, returning the raw sections.
    pub fn into_inner(self) -> Vec<Vec<T>> {
        self.sections
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Checks that `section` exists, returning its item count.
    pub fn check_section(&self, section: usize) -> SectionsResult<usize> {
        self.item_count(section)
            .ok_or(SectionsError::SectionOutOfRange {
                section,
                count: self.sections.len(),
            })
    }

    /// Checks that an item exists at `position`.
    pub fn check_item(&self, position: Position) -> SectionsResult<()> {
        let count = self.check_section(position.section)?;
        if position.item < count {
            Ok(())
        } else {
            Err(SectionsError::ItemOutOfRange { position, count })
        }
    }

    /// Checks that an item could be inserted at `position`.
    pub fn check_insert(&self, position: Position) -> SectionsResult<()> {
        let count = self.check_section(position.section)?;
        if position.item <= count {
            Ok(())
        } else {
            Err(SectionsError::ItemOutOfRange { position, count })
        }
    }

    // -------------------------------------------------------------------------
    // Section mutation
    // -------------------------------------------------------------------------

    /// Appends an empty section, returning its index.
    pub fn append_section(&mut self) -> usize {
        self.sections.push(Vec::new());
        self.sections.len() - 1
    }

    /// Inserts an empty section at `section`.
    pub fn insert_section(&mut self, section: usize) -> SectionsResult<()> {
        if section > self.sections.len() {
            return Err(SectionsError::SectionOutOfRange {
                section,
                count: self.sections.len(),
            });
        }
        self.sections.insert(section, Vec::new());
        Ok(())
    }

    /// Removes the section at `section`, returning its items.
    pub fn remove_section(&mut self, section: usize) -> SectionsResult<Vec<T>> {
        self.check_section(section)?;
        Ok(self.sections.remove(section))
    }

    // -------------------------------------------------------------------------
    // Item mutation
    // -------------------------------------------------------------------------

    /// Appends `item` to the end of `section`, returning its position.
    pub fn append_item(&mut self, section: usize, item: T) -> SectionsResult<Position> {
        let count = self.check_section(section)?;
        self.sections[section].push(item);
        Ok(Position::new(section, count))
    }

    /// Inserts `item` at `position`, shifting later items up by one.
    pub fn insert_item(&mut self, position: Position, item: T) -> SectionsResult<()> {
        self.check_insert(position)?;
        self.sections[position.section].insert(position.item, item);
        Ok(())
    }

    /// Removes and returns the item at `position`.
    pub fn remove_item(&mut self, position: Position) -> SectionsResult<T> {
        self.check_item(position)?;
        Ok(self.sections[position.section].remove(position.item))
    }

    /// Removes the last item of `section`, returning where it was and the item.
    pub fn remove_last_item(&mut self, section: usize) -> SectionsResult<(Position, T)> {
        let count = self.check_section(section)?;
        match self.sections[section].pop() {
            Some(item) => Ok((Position::new(section, count - 1), item)),
            None => Err(SectionsError::ItemOutOfRange {
                position: Position::new(section, 0),
                count: 0,
            }),
        }
    }

    /// Moves the item at `from` so that it ends up at `to`.
    ///
    /// `to` is interpreted after the item has been taken out of `from`, so
    /// moving within one section to its last index uses `len - 1`.
    pub fn move_item(&mut self, from: Position, to: Position) -> SectionsResult<()> {
        self.check_item(from)?;
        let dest_count = self.check_section(to.section)?;
        let dest_count = if from.section == to.section {
            dest_count - 1
        } else {
            dest_count
        };
        if to.item > dest_count {
            return Err(SectionsError::ItemOutOfRange {
                position: to,
                count: dest_count,
            });
        }

        let item = self.sections[from.section].remove(from.item);
        self.sections[to.section].insert(to.item, item);
        Ok(())
    }
}

impl<T> std::ops::Index<Position> for Sections<T> {
    type Output = T;

    fn index(&self, position: Position) -> &T {
        &self.sections[position.section][position.item]
    }
}
