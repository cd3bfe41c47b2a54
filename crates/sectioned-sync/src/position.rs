//! Positions for addressing items in a sectioned sequence.

use std::fmt;

/// The location of an item: a zero-based section index and a zero-based item
/// index within that section.
///
/// A `Position` is only meaningful relative to a particular state of a
/// sequence. The same value refers to different items in the canonical store
/// and in the displayed snapshot, or before and after a deletion.
///
/// Positions order section-major, which is the order a batch update walks
/// them in.
///
/// # Example
///
/// ```
/// use sectioned_sync::Position;
///
/// let first = Position::new(0, 0);
/// let later = Position::new(0, 3);
/// assert!(first < later);
/// assert_eq!(later.to_string(), "(0, 3)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// The section index.
    pub section: usize,
    /// The item index within the section.
    pub item: usize,
}

impl Position {
    /// Creates a position.
    #[inline]
    pub const fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.section, self.item)
    }
}

impl From<(usize, usize)> for Position {
    fn from((section, item): (usize, usize)) -> Self {
        Self::new(section, item)
    }
}
