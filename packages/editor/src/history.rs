//! # Undo/Redo History
//!
//! Linear history of document states.
//!
//! ## Design
//!
//! - Each entry records the state (and selection) before and after a change
//! - Undo restores the `before` snapshot and moves the entry to the redo stack
//! - Redo restores the `after` snapshot
//! - Recording a new change clears the redo stack
//! - Batching groups several commands into one undo step
//!
//! States share their trees through `Arc`, so a snapshot is cheap.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//!
//! let next = apply_command(&state, &command, selection)?;
//! history.record(Snapshot::new(state, selection), Snapshot::new(next.clone(), selection), None);
//!
//! let restored = history.undo();
//! ```

use crate::config::HistoryConfig;
use crate::document::DocumentState;
use crate::selection::Selection;

/// Document state plus the selection that went with it
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: DocumentState,
    pub selection: Selection,
}

impl Snapshot {
    pub fn new(state: DocumentState, selection: Selection) -> Self {
        Self { state, selection }
    }
}

/// One undo step
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub before: Snapshot,
    pub after: Snapshot,
    pub description: Option<String>,
}

/// Undo/redo history for one editing session
#[derive(Debug)]
pub struct History {
    /// Applied steps (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone steps (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Step being built while batching
    current_batch: Option<Batch>,
}

#[derive(Debug, Default)]
struct Batch {
    entry: Option<HistoryEntry>,
    description: Option<String>,
}

impl History {
    /// History with the default 100 undo levels
    pub fn new() -> Self {
        Self::from_config(&HistoryConfig::default())
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::with_max_levels(config.max_levels)
    }

    /// Record a change from `before` to `after`
    pub fn record(&mut self, before: Snapshot, after: Snapshot, description: Option<String>) {
        if let Some(batch) = &mut self.current_batch {
            match &mut batch.entry {
                // Extend the batch: keep its first `before`
                Some(entry) => entry.after = after,
                None => {
                    batch.entry = Some(HistoryEntry {
                        before,
                        after,
                        description: None,
                    })
                }
            }
            self.redo_stack.clear();
            return;
        }

        self.push_entry(HistoryEntry {
            before,
            after,
            description,
        });
    }

    /// Start grouping changes into one undo step
    pub fn begin_batch(&mut self) {
        if self.current_batch.is_none() {
            self.current_batch = Some(Batch::default());
        }
    }

    /// Close the current batch and push it, if it recorded anything
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if let Some(mut entry) = batch.entry {
                entry.description = batch.description;
                self.push_entry(entry);
            }
        }
    }

    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Step back; returns the snapshot to restore
    ///
    /// An open batch is closed first so it can be undone as a whole.
    pub fn undo(&mut self) -> Option<Snapshot> {
        self.end_batch();
        let entry = self.undo_stack.pop()?;
        let snapshot = entry.before.clone();
        self.redo_stack.push(entry);
        Some(snapshot)
    }

    /// Step forward again; returns the snapshot to restore
    pub fn redo(&mut self) -> Option<Snapshot> {
        let entry = self.redo_stack.pop()?;
        let snapshot = entry.after.clone();
        self.undo_stack.push(entry);
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{apply_command, Command};
    use sketchbook_schema::SchemaRegistry;
    use std::sync::Arc;

    fn empty() -> DocumentState {
        DocumentState::empty(Arc::new(SchemaRegistry::rich_text()))
    }

    /// Apply a text insertion at the start of the first paragraph and record it
    fn type_text(history: &mut History, state: &DocumentState, text: &str) -> DocumentState {
        let cursor = Selection::cursor(1);
        let next = apply_command(state, &Command::InsertText { text: text.into() }, cursor).unwrap();
        history.record(
            Snapshot::new(state.clone(), cursor),
            Snapshot::new(next.clone(), cursor),
            Some(format!("type {}", text)),
        );
        next
    }

    #[test]
    fn test_history_creation() {
        let history = History::new();
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_undo_redo() {
        let mut history = History::new();
        let start = empty();
        let typed = type_text(&mut history, &start, "Hello");

        let undone = history.undo().unwrap();
        assert!(undone.state.same_root(&start));
        assert_eq!(history.redo_levels(), 1);
        assert_eq!(history.redo_description(), Some("type Hello"));

        let redone = history.redo().unwrap();
        assert!(redone.state.same_root(&typed));
        assert_eq!(history.undo_levels(), 1);
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_batched_changes() {
        let mut history = History::new();
        let start = empty();

        history.begin_batch();
        history.set_batch_description("Write greeting");
        let first = type_text(&mut history, &start, "World");
        let second = type_text(&mut history, &first, "Hello ");
        history.end_batch();

        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.undo_description(), Some("Write greeting"));
        assert_eq!(second.text_content(), "Hello World");

        let undone = history.undo().unwrap();
        assert!(undone.state.same_root(&start));
    }

    #[test]
    fn test_empty_batch_is_dropped() {
        let mut history = History::new();
        history.begin_batch();
        history.end_batch();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_new_change_clears_redo() {
        let mut history = History::new();
        let start = empty();
        type_text(&mut history, &start, "a");
        history.undo();
        assert_eq!(history.redo_levels(), 1);

        type_text(&mut history, &start, "b");
        assert_eq!(history.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut history = History::with_max_levels(2);
        let mut state = empty();
        for text in ["a", "b", "c"] {
            state = type_text(&mut history, &state, text);
        }
        assert_eq!(history.undo_levels(), 2);
    }
}
