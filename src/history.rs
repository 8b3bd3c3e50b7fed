//! Undo/redo history for the drawing.
//!
//! Every mutating editor operation records a full snapshot of the [`Document`] taken
//! just before the change. Undo swaps the current document with the newest snapshot and
//! keeps the current one for redo.

use crate::constants::MAX_UNDO_HISTORY;
use crate::types::Document;

/// Bounded stacks of document snapshots.
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Snapshots that can be restored by undo, oldest first
    undo_stack: Vec<Document>,
    /// Snapshots that can be restored by redo, oldest first
    redo_stack: Vec<Document>,
}

impl History {
    /// Creates a new empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the state of `document` before a mutation.
    ///
    /// This clears the redo stack since a new edit invalidates any previously undone ones.
    ///
    /// # Arguments
    ///
    /// * `document` - The document as it is right before the change
    pub fn commit(&mut self, document: &Document) {
        self.push_snapshot(document.clone());
    }

    /// Like [`History::commit`] but takes ownership of a snapshot captured earlier,
    /// for edits such as drags that are only known to be real after they finish.
    pub fn push_snapshot(&mut self, snapshot: Document) {
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();

        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Restores the newest snapshot into `document`.
    ///
    /// The node id counter is carried over from the replaced document, so ids handed out
    /// before the undo are never reused.
    ///
    /// # Returns
    ///
    /// `false` (leaving everything untouched) when there is nothing to undo
    pub fn undo(&mut self, document: &mut Document) -> bool {
        match self.undo_stack.pop() {
            Some(previous) => {
                let current = std::mem::replace(document, previous);
                document.raise_next_node_id(current.next_node_id());
                self.redo_stack.push(current);
                true
            }
            None => false,
        }
    }

    /// Re-applies the most recently undone snapshot into `document`.
    ///
    /// # Returns
    ///
    /// `false` (leaving everything untouched) when there is nothing to redo
    pub fn redo(&mut self, document: &mut Document) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                let current = std::mem::replace(document, next);
                document.raise_next_node_id(current.next_node_id());
                self.undo_stack.push(current);
                true
            }
            None => false,
        }
    }

    /// Returns true if there are snapshots that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are snapshots that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undo steps available.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Clears all undo and redo history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_nodes(count: usize) -> Document {
        let mut doc = Document::new();
        for i in 0..count {
            doc.create_node(i as f64, 0.0);
        }
        doc
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = History::new();
        let mut doc = Document::new();

        history.commit(&doc);
        doc.create_node(1.0, 2.0);
        let edited = doc.clone();

        assert!(history.undo(&mut doc));
        assert!(doc.nodes().is_empty());
        assert!(history.can_redo());

        assert!(history.redo(&mut doc));
        assert_eq!(doc, edited);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_history_is_a_noop() {
        let mut history = History::new();
        let mut doc = doc_with_nodes(2);
        let before = doc.clone();
        assert!(!history.undo(&mut doc));
        assert!(!history.redo(&mut doc));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut history = History::new();
        let mut doc = Document::new();
        history.commit(&doc);
        doc.create_node(0.0, 0.0);
        history.undo(&mut doc);
        assert!(history.can_redo());

        history.commit(&doc);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = History::new();
        let mut doc = Document::new();
        for i in 0..(MAX_UNDO_HISTORY + 10) {
            history.commit(&doc);
            doc.create_node(i as f64, 0.0);
        }
        assert_eq!(history.undo_len(), MAX_UNDO_HISTORY);

        let mut steps = 0;
        while history.undo(&mut doc) {
            steps += 1;
        }
        assert_eq!(steps, MAX_UNDO_HISTORY);
        // the oldest retained snapshot, not the empty document
        assert_eq!(doc.nodes().len(), 10);
    }

    #[test]
    fn test_undo_never_lowers_node_counter() {
        let mut history = History::new();
        let mut doc = Document::new();
        history.commit(&doc);
        let first = doc.create_node(0.0, 0.0);
        let second = doc.create_node(100.0, 0.0);

        assert!(history.undo(&mut doc));
        assert!(doc.nodes().is_empty());
        assert_eq!(doc.next_node_id(), second.id + 1);

        history.commit(&doc);
        let third = doc.create_node(0.0, 300.0);
        assert!(third.id > first.id && third.id > second.id);

        // redo of an older branch is gone, but undoing again keeps the counter
        assert!(history.undo(&mut doc));
        assert_eq!(doc.next_node_id(), third.id + 1);
    }
}
