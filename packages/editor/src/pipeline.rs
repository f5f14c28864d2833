//! # Editing Pipeline
//!
//! Coordinates the full edit → render loop for one open section:
//!
//! ```text
//! command ──▶ EditSession ──▶ decorations ──▶ RenderScheduler ──▶ widget slots
//! ```
//!
//! The document is never written by the render side. Completions only reach
//! the scheduler's widget states and the host's slots.
//!
//! Everything that may dispatch a render (`open`, `apply`, `undo`, `redo`)
//! must run inside a tokio runtime.

use crate::commands::Command;
use crate::document::DocumentState;
use crate::errors::{CommandError, EditorError};
use crate::selection::Selection;
use crate::session::EditSession;
use sketchbook_render::{
    CompletionOutcome, DiagramEditor, DiagramRenderer, EditFuture, RenderConfig, RenderScheduler,
    WidgetPlaceholder, WidgetSlot,
};
use sketchbook_schema::{DiagramId, DiagramKind, SchemaRegistry};
use std::sync::Arc;
use tracing::{debug, info};

/// Manages the full edit → render pipeline
pub struct Pipeline {
    session: EditSession,
    scheduler: RenderScheduler,
}

/// Result of one pipeline step
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Version of the state now current
    pub version: u64,

    /// Placeholders derived from that state, in document order
    pub placeholders: Vec<WidgetPlaceholder>,
}

impl Pipeline {
    /// Wrap a session and schedule renders for its diagrams
    pub fn new(session: EditSession, renderer: Arc<dyn DiagramRenderer>, config: &RenderConfig) -> Self {
        let mut pipeline = Self {
            session,
            scheduler: RenderScheduler::new(renderer, config),
        };
        pipeline.update_decorations();
        pipeline
    }

    /// Open a section from the markup held by the project store
    pub fn open(
        section_id: impl Into<String>,
        markup: &str,
        registry: Arc<SchemaRegistry>,
        renderer: Arc<dyn DiagramRenderer>,
        config: &RenderConfig,
    ) -> Result<Self, EditorError> {
        let session = EditSession::open(section_id, markup, registry)?;
        Ok(Self::new(session, renderer, config))
    }

    /// Markup to hand back to the project store
    pub fn save(&self) -> String {
        info!(section = %self.session.id, version = self.session.state().version(), "saving section");
        self.session.serialize()
    }

    /// Apply a command, then re-derive decorations
    pub fn apply(&mut self, command: &Command) -> Result<PipelineResult, EditorError> {
        self.session.apply(command)?;
        Ok(self.refresh())
    }

    pub fn insert_diagram(&mut self, kind: DiagramKind, source: impl Into<String>) -> Result<DiagramId, EditorError> {
        let id = self.session.insert_diagram(kind, source)?;
        self.update_decorations();
        Ok(id)
    }

    pub fn undo(&mut self) -> Option<PipelineResult> {
        self.session.undo().then(|| self.refresh())
    }

    pub fn redo(&mut self) -> Option<PipelineResult> {
        self.session.redo().then(|| self.refresh())
    }

    fn refresh(&mut self) -> PipelineResult {
        let placeholders = self.update_decorations();
        PipelineResult {
            version: self.session.state().version(),
            placeholders,
        }
    }

    /// Recompute placeholders from the current state and hand them to the scheduler
    pub fn update_decorations(&mut self) -> Vec<WidgetPlaceholder> {
        let placeholders = self.session.state().diagrams();
        debug!(
            section = %self.session.id,
            widgets = placeholders.len(),
            "updating decorations"
        );
        self.scheduler.update(&placeholders);
        placeholders
    }

    /// Start an external edit of a diagram's XML
    ///
    /// The returned future does not borrow the pipeline, so editing may go on
    /// while the external editor is open. Feed its result to
    /// [`finish_external_edit`](Self::finish_external_edit).
    pub fn begin_external_edit(&self, id: &DiagramId, editor: &dyn DiagramEditor) -> Result<EditFuture, EditorError> {
        let diagram = self
            .session
            .state()
            .find_diagram(id)
            .ok_or_else(|| CommandError::DiagramNotFound(id.to_string()))?;
        info!(id = %id, "opening external diagram editor");
        Ok(editor.edit(&diagram.source_text))
    }

    /// Write back XML from the external editor
    ///
    /// Fails with `DiagramNotFound` if the diagram was removed meanwhile.
    pub fn finish_external_edit(&mut self, id: &DiagramId, xml: String) -> Result<PipelineResult, EditorError> {
        self.apply(&Command::EditDiagramSource {
            id: id.clone(),
            source: xml,
        })
    }

    /// Run the external editor for a diagram and apply its result
    pub async fn edit_external_diagram(
        &mut self,
        id: &DiagramId,
        editor: &dyn DiagramEditor,
    ) -> Result<PipelineResult, EditorError> {
        let xml = self.begin_external_edit(id, editor)?.await?;
        self.finish_external_edit(id, xml)
    }

    /// Wait for the next render completion and apply it
    pub async fn recv_completion(&mut self) -> Option<CompletionOutcome> {
        self.scheduler.recv_completion().await
    }

    /// Apply completions that already arrived
    pub fn drain_completions(&mut self) -> Vec<CompletionOutcome> {
        self.scheduler.drain_completions()
    }

    /// Wait for every outstanding render
    pub async fn settle(&mut self) -> Vec<CompletionOutcome> {
        self.scheduler.settle().await
    }

    pub fn mount_slot(&mut self, id: DiagramId, slot: Box<dyn WidgetSlot>) {
        self.scheduler.mount_slot(id, slot);
    }

    pub fn unmount_slot(&mut self, id: &DiagramId) -> Option<Box<dyn WidgetSlot>> {
        self.scheduler.unmount_slot(id)
    }

    pub fn state(&self) -> &DocumentState {
        self.session.state()
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Selection changes do not affect decorations
    pub fn set_selection(&mut self, selection: Selection) {
        self.session.set_selection(selection);
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// Drop cached renders (force re-render on the next change)
    pub fn clear_cache(&mut self) {
        self.scheduler.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchbook_render::{RendererSet, WidgetContent};

    #[tokio::test]
    async fn test_pipeline_renders_on_open() {
        let mut pipeline = Pipeline::open(
            "s1",
            r#"<doc><diagram id="d1" kind="flowchart" source="A-&gt;B"/></doc>"#,
            Arc::new(SchemaRegistry::rich_text()),
            Arc::new(RendererSet::builtin()),
            &RenderConfig::default(),
        )
        .unwrap();

        let id = DiagramId::from("d1");
        assert_eq!(pipeline.scheduler().content(&id), Some(WidgetContent::Loading));

        pipeline.settle().await;
        assert!(matches!(
            pipeline.scheduler().content(&id),
            Some(WidgetContent::Rendered(_))
        ));
    }

    #[tokio::test]
    async fn test_pipeline_apply_increments_version() {
        let mut pipeline = Pipeline::open(
            "s1",
            "<doc><paragraph>Hi</paragraph></doc>",
            Arc::new(SchemaRegistry::rich_text()),
            Arc::new(RendererSet::builtin()),
            &RenderConfig::default(),
        )
        .unwrap();

        pipeline.set_selection(Selection::cursor(3));
        let result = pipeline.apply(&Command::InsertText { text: "!".into() }).unwrap();
        assert_eq!(result.version, 1);
        assert!(result.placeholders.is_empty());
        assert_eq!(pipeline.save(), "<doc>\n  <paragraph>Hi!</paragraph>\n</doc>\n");
    }
}
