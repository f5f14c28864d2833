//! # Document State
//!
//! Immutable snapshot of one section's content.
//!
//! Commands never touch a state in place: they build a new tree and wrap it in
//! a new `DocumentState`. The root sits behind an `Arc`, so keeping old states
//! around for undo costs a pointer each.
//!
//! ## Lifecycle
//!
//! ```text
//! markup ──deserialize──▶ DocumentState ──apply_command──▶ DocumentState ──serialize──▶ markup
//! ```

use sketchbook_markup::ParseError;
use sketchbook_render::{decorations, WidgetPlaceholder};
use sketchbook_schema::rich_text::PARAGRAPH;
use sketchbook_schema::{DiagramId, Node, SchemaRegistry, ValidationError};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DocumentState {
    root: Arc<Node>,
    registry: Arc<SchemaRegistry>,
    /// Number of transactions that led to this state
    version: u64,
}

impl DocumentState {
    /// Validated state around an existing tree
    pub fn new(root: Node, registry: Arc<SchemaRegistry>) -> Result<Self, ValidationError> {
        registry.validate_document(&root)?;
        Ok(Self {
            root: Arc::new(root),
            registry,
            version: 0,
        })
    }

    /// Fresh section: the root holding one empty paragraph
    pub fn empty(registry: Arc<SchemaRegistry>) -> Self {
        let root = Node::container(registry.top_node(), vec![Node::container(PARAGRAPH, vec![])]);
        Self {
            root: Arc::new(root),
            registry,
            version: 0,
        }
    }

    /// Successor state holding `root`; callers validate first
    pub(crate) fn with_root(&self, root: Node) -> Self {
        Self {
            root: Arc::new(root),
            registry: Arc::clone(&self.registry),
            version: self.version + 1,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Largest valid position
    pub fn content_size(&self) -> usize {
        self.root.content_size()
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    /// Whether both states hold the very same tree
    pub fn same_root(&self, other: &DocumentState) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// Diagram placeholders in document order
    pub fn diagrams(&self) -> Vec<WidgetPlaceholder> {
        decorations(&self.root, &self.registry)
    }

    pub fn find_diagram(&self, id: &DiagramId) -> Option<WidgetPlaceholder> {
        self.diagrams().into_iter().find(|p| &p.id == id)
    }

    pub fn has_diagram(&self, id: &DiagramId) -> bool {
        self.find_diagram(id).is_some()
    }
}

/// Content equality; versions are ignored
impl PartialEq for DocumentState {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

/// Markup for a document state
pub fn serialize(state: &DocumentState) -> String {
    sketchbook_markup::serialize(&state.root, &state.registry)
}

/// Load a document state from markup, validating it against `registry`
pub fn deserialize(markup: &str, registry: Arc<SchemaRegistry>) -> Result<DocumentState, ParseError> {
    let root = sketchbook_markup::deserialize(markup, &registry)?;
    Ok(DocumentState {
        root: Arc::new(root),
        registry,
        version: 0,
    })
}
