//! Error types for sectioned sequences and reconciliation.

use thiserror::Error;

use crate::edit::EditKind;
use crate::position::Position;

/// Addressing failures when reading or mutating a sectioned sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectionsError {
    /// The section index does not exist.
    #[error("section {section} out of range (section count {count})")]
    SectionOutOfRange { section: usize, count: usize },

    /// The item index does not exist in its section.
    #[error("item {position} out of range (section holds {count} items)")]
    ItemOutOfRange { position: Position, count: usize },

    /// A bulk operation was given a different number of items and positions.
    #[error("bulk operation has {items} items but {positions} positions")]
    LengthMismatch { items: usize, positions: usize },
}

/// An edit in a change batch references state the batch cannot have produced.
///
/// This is a broken contract between the mutation serializer and the
/// reconciliation engine, never a recoverable runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot reconcile {kind} edit: {source}")]
pub struct ReconcileError {
    /// The kind of edit that failed to classify.
    pub kind: EditKind,
    /// What was wrong with its addressing.
    #[source]
    pub source: SectionsError,
}

/// A renderer operation set that does not transform one shape into another.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InconsistentUpdate {
    /// Section insertions and deletions do not account for the section count.
    #[error(
        "section count {before} -> {after} does not match +{inserted} -{deleted} sections"
    )]
    SectionCount {
        before: usize,
        after: usize,
        inserted: usize,
        deleted: usize,
    },

    /// A section operation addresses a section that does not exist.
    #[error("section {section} out of range")]
    SectionOutOfRange { section: usize },

    /// An item operation addresses a position that does not exist.
    #[error("item {position} out of range")]
    ItemOutOfRange { position: Position },

    /// The same position is used twice on one side of the batch.
    #[error("move {from} -> {to} collides with another operation")]
    Duplicate { from: Position, to: Position },

    /// A move lands in a section created by the same batch.
    #[error("move {from} -> {to} lands in a newly inserted section")]
    MoveIntoNewSection { from: Position, to: Position },

    /// A section ends up with a different number of items than its operations imply.
    #[error("section {section} holds {actual} items, operations imply {expected:?}")]
    ItemCount {
        section: usize,
        expected: Option<usize>,
        actual: usize,
    },
}

/// Result type for sectioned-sequence operations.
pub type SectionsResult<T> = std::result::Result<T, SectionsError>;
