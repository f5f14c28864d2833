//! # Edit Session
//!
//! One open section: its current state, selection, history and diagram id
//! generator. All edits go through [`EditSession::apply`], which runs the
//! command, records history and moves the selection.

use crate::commands::{apply_command, Command};
use crate::config::HistoryConfig;
use crate::document::{self, DocumentState};
use crate::errors::EditorError;
use crate::history::{History, Snapshot};
use crate::selection::Selection;
use sketchbook_schema::{DiagramId, DiagramKind, IdGenerator, SchemaRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct EditSession {
    /// Section identifier; also seeds minted diagram ids
    pub id: String,

    state: DocumentState,
    selection: Selection,
    history: History,
    ids: IdGenerator,
}

impl EditSession {
    pub fn new(id: impl Into<String>, state: DocumentState) -> Self {
        let id = id.into();
        Self {
            ids: IdGenerator::new(&id),
            id,
            state,
            selection: Selection::default(),
            history: History::new(),
        }
    }

    pub fn with_history_config(mut self, config: &HistoryConfig) -> Self {
        self.history = History::from_config(config);
        self
    }

    /// Open a section from its stored markup
    pub fn open(
        id: impl Into<String>,
        markup: &str,
        registry: Arc<SchemaRegistry>,
    ) -> Result<Self, EditorError> {
        let state = document::deserialize(markup, registry)?;
        let session = Self::new(id, state);
        info!(
            section = %session.id,
            diagrams = session.state.diagrams().len(),
            "opened section"
        );
        Ok(session)
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Move the selection; out-of-range ends are clamped
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamp(self.state.content_size());
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run a command against the current state and record it for undo
    pub fn apply(&mut self, command: &Command) -> Result<&DocumentState, EditorError> {
        self.apply_described(command, command.name())
    }

    pub fn apply_described(
        &mut self,
        command: &Command,
        description: impl Into<String>,
    ) -> Result<&DocumentState, EditorError> {
        let next = apply_command(&self.state, command, self.selection).map_err(|error| {
            debug!(section = %self.id, command = command.name(), error = %error, "command rejected");
            error
        })?;

        let selection = selection_after(command, self.selection, &next);
        self.history.record(
            Snapshot::new(self.state.clone(), self.selection),
            Snapshot::new(next.clone(), selection),
            Some(description.into()),
        );

        debug!(
            section = %self.id,
            command = command.name(),
            version = next.version(),
            "applied command"
        );

        self.state = next;
        self.selection = selection;
        Ok(&self.state)
    }

    /// Insert a diagram block at the cursor under a freshly minted id
    pub fn insert_diagram(&mut self, kind: DiagramKind, source: impl Into<String>) -> Result<DiagramId, EditorError> {
        let id = self.mint_diagram_id();
        self.apply(&Command::InsertDiagramBlock {
            id: id.clone(),
            kind,
            source: source.into(),
        })?;
        Ok(id)
    }

    /// Turn the selected text into an inline diagram under a freshly minted id
    pub fn insert_inline_diagram(
        &mut self,
        kind: DiagramKind,
        source: impl Into<String>,
    ) -> Result<DiagramId, EditorError> {
        let id = self.mint_diagram_id();
        self.apply(&Command::SetDiagramMark {
            id: id.clone(),
            kind,
            source: source.into(),
        })?;
        Ok(id)
    }

    fn mint_diagram_id(&mut self) -> DiagramId {
        let taken: HashSet<DiagramId> = self.state.diagrams().into_iter().map(|p| p.id).collect();
        DiagramId::new(self.ids.new_unique_id(|candidate| taken.contains(&DiagramId::from(candidate))))
    }

    /// Restore the previous state; false when there is nothing to undo
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone change; false when there is nothing to redo
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        debug!(section = %self.id, version = snapshot.state.version(), "restoring snapshot");
        self.state = snapshot.state;
        self.selection = snapshot.selection.clamp(self.state.content_size());
    }

    pub fn begin_batch(&mut self, description: impl Into<String>) {
        self.history.begin_batch();
        self.history.set_batch_description(description);
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    /// Markup for the current state
    pub fn serialize(&self) -> String {
        document::serialize(&self.state)
    }
}

/// Where the selection lands after `command` produced `state`
fn selection_after(command: &Command, before: Selection, state: &DocumentState) -> Selection {
    let selection = match command {
        Command::InsertText { text } => Selection::cursor(before.from() + text.chars().count()),
        Command::DeleteRange => Selection::cursor(before.from()),
        Command::InsertDiagramBlock { id, .. } => state
            .find_diagram(id)
            .map(|diagram| Selection::cursor(diagram.position + 1))
            .unwrap_or(before),
        _ => before,
    };
    selection.clamp(state.content_size())
}
