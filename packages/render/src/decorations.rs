//! # Decorations
//!
//! Derives widget placeholders from a document tree.
//!
//! Placeholders are never stored in the document: they are recomputed from
//! scratch after every state change and handed to the
//! [`RenderScheduler`](crate::scheduler::RenderScheduler), which diffs them
//! against what it already rendered.

use sketchbook_schema::{DiagramId, DiagramKind, DiagramSource, Node, SchemaRegistry, SourceHash};

/// Where a rendered diagram will be shown
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetPlaceholder {
    pub id: DiagramId,
    pub kind: DiagramKind,
    pub source_text: String,
    pub source_hash: SourceHash,
    /// Document position of the diagram node, or of the first run of an
    /// inline diagram
    pub position: usize,
    pub inline: bool,
}

impl WidgetPlaceholder {
    pub fn new(source: DiagramSource, position: usize, inline: bool) -> Self {
        let source_hash = source.hash();
        Self {
            id: source.id,
            kind: source.kind,
            source_text: source.source,
            source_hash,
            position,
            inline,
        }
    }
}

/// Placeholders for every diagram block and inline diagram run, in document order
pub fn decorations(root: &Node, registry: &SchemaRegistry) -> Vec<WidgetPlaceholder> {
    let mut placeholders = Vec::new();
    collect(root, 0, registry, &mut placeholders);
    placeholders
}

fn collect(node: &Node, start: usize, registry: &SchemaRegistry, out: &mut Vec<WidgetPlaceholder>) {
    let mut pos = start;
    let mut previous_inline: Option<DiagramId> = None;

    for child in node.children() {
        if registry.is_diagram_node(&child.node_type) {
            if let Some(source) = child.diagram_source() {
                out.push(WidgetPlaceholder::new(source, pos, false));
            }
        }

        let inline = child
            .marks
            .iter()
            .filter(|mark| registry.is_diagram_mark(&mark.mark_type))
            .find_map(|mark| mark.diagram_source());

        // Adjacent runs of one inline diagram make one placeholder
        previous_inline = match inline {
            Some(source) => {
                if previous_inline.as_ref() != Some(&source.id) {
                    let id = source.id.clone();
                    out.push(WidgetPlaceholder::new(source, pos, true));
                    Some(id)
                } else {
                    previous_inline
                }
            }
            None => None,
        };

        if child.is_container() {
            collect(child, pos + 1, registry, out);
        }
        pos += child.node_size();
    }
}
