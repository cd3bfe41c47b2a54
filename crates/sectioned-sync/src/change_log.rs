//! Append-only buffer of logical edits between apply cycles.

use crate::edit::Edit;

/// The edits accumulated since the previous apply cycle began.
///
/// A batch is produced by [`ChangeLog::take`], consumed once by
/// reconciliation, then discarded. Order is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch<T> {
    sequence: u64,
    edits: Vec<Edit<T>>,
}

impl<T> ChangeBatch<T> {
    /// Creates a batch from edits directly.
    pub fn new(sequence: u64, edits: Vec<Edit<T>>) -> Self {
        Self { sequence, edits }
    }

    /// Monotonic number of this batch within its change log.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The edits, in recording order.
    pub fn edits(&self) -> &[Edit<T>] {
        &self.edits
    }

    /// Number of edits in the batch.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Returns `true` if the batch holds no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Consumes the batch, returning its edits.
    pub fn into_edits(self) -> Vec<Edit<T>> {
        self.edits
    }
}

impl<T> IntoIterator for ChangeBatch<T> {
    type Item = Edit<T>;
    type IntoIter = std::vec::IntoIter<Edit<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.into_iter()
    }
}

/// Pending logical edits, written by the mutation serializer and drained by
/// the apply scheduler.
///
/// The log itself is not synchronized; owners wrap it in a lock so that
/// [`take`](Self::take) is atomic with respect to concurrent
/// [`record`](Self::record) calls.
#[derive(Debug)]
pub struct ChangeLog<T> {
    edits: Vec<Edit<T>>,
    next_sequence: u64,
}

impl<T> Default for ChangeLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChangeLog<T> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            edits: Vec::new(),
            next_sequence: 1,
        }
    }

    /// Appends an edit.
    pub fn record(&mut self, edit: Edit<T>) {
        self.edits.push(edit);
    }

    /// Number of edits waiting.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Returns `true` if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Swaps out every pending edit as a batch, leaving the log empty.
    pub fn take(&mut self) -> ChangeBatch<T> {
        let capacity = self.edits.capacity();
        let edits = std::mem::replace(&mut self.edits, Vec::with_capacity(capacity));
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        ChangeBatch { sequence, edits }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn test_take_flushes_in_order() {
        let mut log = ChangeLog::new();
        log.record(Edit::AppendSection { section: 0 });
        log.record(Edit::AppendItem {
            item: 1,
            position: Position::new(0, 0),
        });
        assert_eq!(log.len(), 2);

        let batch = log.take();
        assert!(log.is_empty());
        assert_eq!(batch.sequence(), 1);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.edits()[0], Edit::AppendSection { section: 0 });

        let next = log.take();
        assert!(next.is_empty());
        assert_eq!(next.sequence(), 2);
    }

    #[test]
    fn test_batch_into_iter() {
        let batch = ChangeBatch::new(
            7,
            vec![Edit::<u8>::DeleteSection { section: 0 }],
        );
        let kinds: Vec<_> = batch.into_iter().map(|edit| edit.kind()).collect();
        assert_eq!(kinds, vec![crate::edit::EditKind::DeleteSection]);
    }
}
