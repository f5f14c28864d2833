//! # Commands
//!
//! Semantic edits on a [`DocumentState`].
//!
//! ## Design Principles
//!
//! 1. **Pure**: `apply_command` reads a state and returns a new one; the input
//!    is never modified and a failed command changes nothing
//! 2. **Validated**: every produced tree is checked against the schema before
//!    it is returned
//! 3. **Canonical**: touched inline content is re-normalized (adjacent runs
//!    with equal marks merged, marks in registry order) so equal documents
//!    compare and serialize equally
//!
//! ## Selection semantics
//!
//! Formatting commands act on the text inside `[from, to)`, splitting runs at
//! the selection edges. Atomic nodes (diagrams, hard breaks, unknown content)
//! are opaque to formatting. A selection covering no text fails with
//! `EmptySelection`. `ToggleMark` never drops a mark it excludes; `SetMark` does.
//!
//! ### Diagrams
//! - `InsertDiagramBlock` puts an atomic block at the cursor, splitting the
//!   enclosing textblock when the cursor is inside one
//! - `EditDiagramSource` replaces only the `source` attribute, keeping the id
//!   stable; it is the only command that changes a diagram's source hash

use crate::document::DocumentState;
use crate::errors::CommandError;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use sketchbook_schema::rich_text::{DIAGRAM, FONT_SIZE, INLINE_DIAGRAM, SIZE_ATTR};
use sketchbook_schema::{
    merge_text_runs, AttrValue, Attrs, DiagramId, DiagramKind, DiagramSource, Length, Mark, Node,
    SchemaRegistry, ValidationError, ID_ATTR, SOURCE_ATTR,
};

/// Semantic edits (intent-preserving operations)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Insert text at the cursor, replacing a non-empty selection
    InsertText { text: String },

    /// Remove inline content and atomic blocks inside the selection
    DeleteRange,

    /// Apply a mark to the selected text, overwriting one of the same type
    SetMark { mark: Mark },

    RemoveMark { mark_type: String },

    /// Remove the mark if all selected text has it, apply it otherwise
    ToggleMark { mark_type: String },

    SetFontSize { size: Length },

    /// Convert the textblocks touched by the selection
    SetBlockType {
        node_type: String,
        #[serde(default)]
        attrs: Attrs,
    },

    InsertDiagramBlock {
        id: DiagramId,
        kind: DiagramKind,
        source: String,
    },

    /// Turn the selected text into an inline diagram
    SetDiagramMark {
        id: DiagramId,
        kind: DiagramKind,
        source: String,
    },

    EditDiagramSource { id: DiagramId, source: String },

    RemoveDiagram { id: DiagramId },
}

impl Command {
    /// Debug name, also used as the default history description
    pub fn name(&self) -> &'static str {
        match self {
            Command::InsertText { .. } => "insert_text",
            Command::DeleteRange => "delete_range",
            Command::SetMark { .. } => "set_mark",
            Command::RemoveMark { .. } => "remove_mark",
            Command::ToggleMark { .. } => "toggle_mark",
            Command::SetFontSize { .. } => "set_font_size",
            Command::SetBlockType { .. } => "set_block_type",
            Command::InsertDiagramBlock { .. } => "insert_diagram_block",
            Command::SetDiagramMark { .. } => "set_diagram_mark",
            Command::EditDiagramSource { .. } => "edit_diagram_source",
            Command::RemoveDiagram { .. } => "remove_diagram",
        }
    }
}

/// Apply a command to a state
///
/// Returns the successor state, or an error with `state` left untouched.
pub fn apply_command(
    state: &DocumentState,
    command: &Command,
    selection: Selection,
) -> Result<DocumentState, CommandError> {
    let registry = state.registry().as_ref();
    let selection = selection.clamp(state.content_size());
    let root = state.root();

    let new_root = match command {
        Command::InsertText { text } => insert_text(root, registry, selection, text)?,
        Command::DeleteRange => {
            if selection.is_empty() {
                return Err(CommandError::EmptySelection);
            }
            delete_range(root, registry, selection.from(), selection.to())
        }
        Command::SetMark { mark } => {
            let mark = registry.create_mark(&mark.mark_type, mark.attrs.clone())?;
            set_mark(root, registry, selection, &mark)?
        }
        Command::RemoveMark { mark_type } => remove_mark(root, registry, selection, mark_type)?,
        Command::ToggleMark { mark_type } => toggle_mark(root, registry, selection, mark_type)?,
        Command::SetFontSize { size } => {
            if !size.is_positive() {
                return Err(CommandError::InvalidAttribute {
                    name: SIZE_ATTR.to_string(),
                    reason: format!("font size must be positive, got {}", size),
                });
            }
            let mut attrs = Attrs::new();
            attrs.insert(SIZE_ATTR.to_string(), AttrValue::Length(*size));
            let mark = registry.create_mark(FONT_SIZE, attrs)?;
            set_mark(root, registry, selection, &mark)?
        }
        Command::SetBlockType { node_type, attrs } => {
            set_block_type(root, registry, selection, node_type, attrs.clone())?
        }
        Command::InsertDiagramBlock { id, kind, source } => {
            ensure_new_diagram(state, id)?;
            let diagram = DiagramSource::new(id.clone(), *kind, source.clone());
            let node = registry.create_atom(DIAGRAM, diagram.to_attrs())?;
            insert_block(root, registry, selection.head, node)?
        }
        Command::SetDiagramMark { id, kind, source } => {
            ensure_new_diagram(state, id)?;
            let diagram = DiagramSource::new(id.clone(), *kind, source.clone());
            let mark = registry.create_mark(INLINE_DIAGRAM, diagram.to_attrs())?;
            set_mark(root, registry, selection, &mark)?
        }
        Command::EditDiagramSource { id, source } => edit_diagram_source(root, registry, id, source)?,
        Command::RemoveDiagram { id } => remove_diagram(root, registry, id)?,
    };

    registry.validate_document(&new_root)?;
    Ok(state.with_root(new_root))
}

fn ensure_new_diagram(state: &DocumentState, id: &DiagramId) -> Result<(), CommandError> {
    if state.has_diagram(id) {
        return Err(CommandError::DuplicateDiagramId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Locating textblocks
// ---------------------------------------------------------------------------

/// A textblock found in the tree
#[derive(Debug, Clone)]
struct Textblock {
    /// Child indices leading from the root to the textblock
    path: Vec<usize>,
    content_start: usize,
    content_size: usize,
}

impl Textblock {
    fn content_end(&self) -> usize {
        self.content_start + self.content_size
    }

    /// Local `[from, to)` inside this block, if the block's content overlaps it
    fn overlap(&self, from: usize, to: usize) -> Option<(usize, usize)> {
        if from >= to || self.content_end() <= from || self.content_start >= to {
            return None;
        }
        let local_from = from.saturating_sub(self.content_start);
        let local_to = (to - self.content_start).min(self.content_size);
        Some((local_from, local_to))
    }

    /// Whether `[from, to]` touches this block's content, edges included
    fn touches(&self, from: usize, to: usize) -> bool {
        from <= self.content_end() && to >= self.content_start
    }
}

fn is_textblock(registry: &SchemaRegistry, node: &Node) -> bool {
    registry
        .node_spec(&node.node_type)
        .map(|spec| spec.is_textblock())
        .unwrap_or(false)
}

/// Every textblock in document order
fn textblocks(root: &Node, registry: &SchemaRegistry) -> Vec<Textblock> {
    let mut out = Vec::new();
    collect_textblocks(root, 0, registry, &mut Vec::new(), &mut out);
    out
}

fn collect_textblocks(
    node: &Node,
    content_start: usize,
    registry: &SchemaRegistry,
    path: &mut Vec<usize>,
    out: &mut Vec<Textblock>,
) {
    let mut pos = content_start;
    for (index, child) in node.children().iter().enumerate() {
        path.push(index);
        if is_textblock(registry, child) {
            out.push(Textblock {
                path: path.clone(),
                content_start: pos + 1,
                content_size: child.content_size(),
            });
        } else if child.is_container() {
            collect_textblocks(child, pos + 1, registry, path, out);
        }
        path.pop();
        pos += child.node_size();
    }
}

fn node_at_mut<'a>(root: &'a mut Node, path: &[usize]) -> Option<&'a mut Node> {
    let mut node = root;
    for &index in path {
        node = node.children_mut()?.get_mut(index)?;
    }
    Some(node)
}

// ---------------------------------------------------------------------------
// Inline run surgery
// ---------------------------------------------------------------------------

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(text.len())
}

/// Copy of a text run holding only `text`
fn run_with_text(run: &Node, text: &str) -> Node {
    Node::marked_text(text, run.marks.clone())
}

/// Split text runs at `from` and `to`, then pass every run inside `[from, to)` to `f`
///
/// Offsets are local to the inline content. Returns the normalized children
/// and the number of runs passed to `f`.
fn map_runs<F>(children: &[Node], from: usize, to: usize, f: &mut F) -> (Vec<Node>, usize)
where
    F: FnMut(&mut Node),
{
    let mut out = Vec::with_capacity(children.len() + 2);
    let mut touched = 0;
    let mut pos = 0;

    for child in children {
        let start = pos;
        let size = child.node_size();
        pos += size;

        if !child.is_text() || start + size <= from || start >= to {
            out.push(child.clone());
            continue;
        }

        let text = child.text.as_deref().unwrap_or_default();
        let cut_from = byte_offset(text, from.saturating_sub(start));
        let cut_to = byte_offset(text, (to - start).min(size));

        if cut_from > 0 {
            out.push(run_with_text(child, &text[..cut_from]));
        }
        let mut selected = run_with_text(child, &text[cut_from..cut_to]);
        f(&mut selected);
        touched += 1;
        out.push(selected);
        if cut_to < text.len() {
            out.push(run_with_text(child, &text[cut_to..]));
        }
    }

    (merge_text_runs(out), touched)
}

/// Apply `f` to every selected text run in the document
fn map_selected_runs<F>(
    root: &Node,
    registry: &SchemaRegistry,
    selection: Selection,
    mut f: F,
) -> Result<Node, CommandError>
where
    F: FnMut(&mut Node),
{
    let mut new_root = root.clone();
    let mut touched = 0;

    for block in textblocks(root, registry) {
        let Some((from, to)) = block.overlap(selection.from(), selection.to()) else {
            continue;
        };
        let node = node_at_mut(&mut new_root, &block.path).ok_or(CommandError::InvalidPosition(block.content_start))?;
        let (children, count) = map_runs(node.children(), from, to, &mut f);
        node.children = Some(children);
        touched += count;
    }

    if touched == 0 {
        return Err(CommandError::EmptySelection);
    }
    Ok(new_root)
}

/// Visit every selected text run, without modifying anything
fn selected_runs<'a>(root: &'a Node, registry: &SchemaRegistry, selection: Selection) -> Vec<&'a Node> {
    let mut runs = Vec::new();
    for block in textblocks(root, registry) {
        let Some((from, to)) = block.overlap(selection.from(), selection.to()) else {
            continue;
        };
        let Some(node) = node_at(root, &block.path) else {
            continue;
        };

        let mut pos = 0;
        for child in node.children() {
            let size = child.node_size();
            if child.is_text() && pos + size > from && pos < to {
                runs.push(child);
            }
            pos += size;
        }
    }
    runs
}

fn node_at<'a>(root: &'a Node, path: &[usize]) -> Option<&'a Node> {
    let mut node = root;
    for &index in path {
        node = node.children().get(index)?;
    }
    Some(node)
}

// ---------------------------------------------------------------------------
// Marks
// ---------------------------------------------------------------------------

fn add_mark(run: &mut Node, mark: &Mark, registry: &SchemaRegistry) {
    let excluded = registry.exclusions_of(&mark.mark_type);
    run.marks
        .retain(|m| m.mark_type != mark.mark_type && !excluded.contains(&m.mark_type));
    run.marks.push(mark.clone());
    registry.sort_marks(&mut run.marks);
}

fn set_mark(root: &Node, registry: &SchemaRegistry, selection: Selection, mark: &Mark) -> Result<Node, CommandError> {
    map_selected_runs(root, registry, selection, |run| add_mark(run, mark, registry))
}

fn remove_mark(
    root: &Node,
    registry: &SchemaRegistry,
    selection: Selection,
    mark_type: &str,
) -> Result<Node, CommandError> {
    if !registry.has_mark_type(mark_type) {
        return Err(ValidationError::UnknownMarkType(mark_type.to_string()).into());
    }
    map_selected_runs(root, registry, selection, |run| {
        run.marks.retain(|m| m.mark_type != mark_type)
    })
}

fn toggle_mark(
    root: &Node,
    registry: &SchemaRegistry,
    selection: Selection,
    mark_type: &str,
) -> Result<Node, CommandError> {
    let mark = registry.create_mark(mark_type, Attrs::new())?;

    let runs = selected_runs(root, registry, selection);
    if runs.is_empty() {
        return Err(CommandError::EmptySelection);
    }

    if runs.iter().all(|run| run.has_mark(mark_type)) {
        return remove_mark(root, registry, selection, mark_type);
    }

    // An exclusive mark already on the selection blocks the toggle
    let excluded = registry.exclusions_of(mark_type);
    if let Some(existing) = runs
        .iter()
        .flat_map(|run| run.marks.iter())
        .find(|m| excluded.contains(&m.mark_type))
    {
        return Err(ValidationError::ExclusiveMarks {
            first: existing.mark_type.clone(),
            second: mark_type.to_string(),
        }
        .into());
    }

    set_mark(root, registry, selection, &mark)
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

fn insert_text(root: &Node, registry: &SchemaRegistry, selection: Selection, text: &str) -> Result<Node, CommandError> {
    if text.is_empty() {
        return Err(CommandError::EmptyText);
    }

    let at = selection.from();
    let mut new_root = if selection.is_empty() {
        root.clone()
    } else {
        delete_range(root, registry, selection.from(), selection.to())
    };

    let block = textblocks(&new_root, registry)
        .into_iter()
        .find(|block| block.content_start <= at && at <= block.content_end())
        .ok_or(CommandError::InvalidPosition(at))?;

    let node = node_at_mut(&mut new_root, &block.path).ok_or(CommandError::InvalidPosition(at))?;
    let local = at - block.content_start;
    let children = insert_run(node.children(), local, text, registry);
    node.children = Some(children);

    Ok(new_root)
}

fn insert_run(children: &[Node], at: usize, text: &str, registry: &SchemaRegistry) -> Vec<Node> {
    let mut pending = Some(Node::marked_text(text, inherited_marks(children, at, registry)));
    let mut out = Vec::with_capacity(children.len() + 2);
    let mut pos = 0;

    for child in children {
        let size = child.node_size();
        if pending.is_some() && child.is_text() && pos < at && at < pos + size {
            let content = child.text.as_deref().unwrap_or_default();
            let cut = byte_offset(content, at - pos);
            out.push(run_with_text(child, &content[..cut]));
            out.extend(pending.take());
            out.push(run_with_text(child, &content[cut..]));
        } else {
            if pos == at {
                out.extend(pending.take());
            }
            out.push(child.clone());
        }
        pos += size;
    }
    out.extend(pending);

    merge_text_runs(out)
}

/// Marks of the run left of `at`
///
/// An inline diagram mark is only inherited when the new text lands inside the
/// diagram's runs, so typing after a diagram does not extend it.
fn inherited_marks(children: &[Node], at: usize, registry: &SchemaRegistry) -> Vec<Mark> {
    let mut pos = 0;
    for (index, child) in children.iter().enumerate() {
        let size = child.node_size();
        if pos < at && at <= pos + size {
            if !child.is_text() {
                return Vec::new();
            }
            let inside = at < pos + size;
            let right = children.get(index + 1);
            return child
                .marks
                .iter()
                .filter(|mark| {
                    !registry.is_diagram_mark(&mark.mark_type)
                        || inside
                        || right.map(|r| r.marks.contains(mark)).unwrap_or(false)
                })
                .cloned()
                .collect();
        }
        pos += size;
    }
    Vec::new()
}

fn delete_range(root: &Node, registry: &SchemaRegistry, from: usize, to: usize) -> Node {
    let mut new_root = root.clone();
    new_root.children = Some(delete_blocks(root.children(), 0, registry, from, to));
    new_root
}

fn delete_blocks(children: &[Node], content_start: usize, registry: &SchemaRegistry, from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut pos = content_start;

    for child in children {
        let start = pos;
        let size = child.node_size();
        pos += size;

        if start + size <= from || start >= to {
            out.push(child.clone());
        } else if is_textblock(registry, child) {
            let local_from = from.saturating_sub(start + 1);
            let local_to = (to.saturating_sub(start + 1)).min(child.content_size());
            let mut block = child.clone();
            block.children = Some(delete_inline(child.children(), local_from, local_to));
            out.push(block);
        } else if child.is_container() {
            let mut container = child.clone();
            container.children = Some(delete_blocks(child.children(), start + 1, registry, from, to));
            out.push(container);
        } else if !(from <= start && start + 1 <= to) {
            // Atomic block only partly selected
            out.push(child.clone());
        }
    }

    out
}

fn delete_inline(children: &[Node], from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut pos = 0;

    for child in children {
        let start = pos;
        let size = child.node_size();
        pos += size;

        if start + size <= from || start >= to {
            out.push(child.clone());
            continue;
        }

        if let Some(text) = child.text.as_deref() {
            let cut_from = byte_offset(text, from.saturating_sub(start));
            let cut_to = byte_offset(text, (to - start).min(size));
            let kept = format!("{}{}", &text[..cut_from], &text[cut_to..]);
            out.push(run_with_text(child, &kept));
        }
        // Inline atoms inside the range are dropped
    }

    merge_text_runs(out)
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

fn set_block_type(
    root: &Node,
    registry: &SchemaRegistry,
    selection: Selection,
    node_type: &str,
    attrs: Attrs,
) -> Result<Node, CommandError> {
    let is_target_textblock = registry
        .node_spec(node_type)
        .map(|spec| spec.is_textblock())
        .unwrap_or(false);
    if !is_target_textblock {
        return Err(CommandError::InvalidBlockType(node_type.to_string()));
    }
    let attrs = registry.resolve_node_attrs(node_type, attrs)?;

    let mut new_root = root.clone();
    let mut converted = 0;
    for block in textblocks(root, registry) {
        if !block.touches(selection.from(), selection.to()) {
            continue;
        }
        let node = node_at_mut(&mut new_root, &block.path).ok_or(CommandError::InvalidPosition(block.content_start))?;
        node.node_type = node_type.to_string();
        node.attrs = attrs.clone();
        converted += 1;
    }

    if converted == 0 {
        return Err(CommandError::InvalidPosition(selection.from()));
    }
    Ok(new_root)
}

fn insert_block(root: &Node, registry: &SchemaRegistry, at: usize, block: Node) -> Result<Node, CommandError> {
    let mut new_root = root.clone();
    insert_block_into(&mut new_root, 0, registry, at, block)?;
    Ok(new_root)
}

fn insert_block_into(
    container: &mut Node,
    content_start: usize,
    registry: &SchemaRegistry,
    at: usize,
    block: Node,
) -> Result<(), CommandError> {
    let fits = registry.can_contain(&container.node_type, &block.node_type);
    let children = container
        .children
        .as_mut()
        .ok_or(CommandError::InvalidPosition(at))?;

    let mut pos = content_start;
    let mut index = 0;
    loop {
        if pos == at && fits {
            children.insert(index, block);
            return Ok(());
        }
        let Some(child) = children.get(index) else {
            break;
        };
        let size = child.node_size();

        if pos < at && at < pos + size {
            if is_textblock(registry, child) {
                if !fits {
                    return Err(CommandError::InvalidPosition(at));
                }
                let offset = at - (pos + 1);
                let content_size = child.content_size();
                if offset == content_size {
                    children.insert(index + 1, block);
                } else if offset == 0 {
                    children.insert(index, block);
                } else {
                    let (left, right) = split_textblock(child, offset);
                    children[index] = left;
                    children.insert(index + 1, block);
                    children.insert(index + 2, right);
                }
                return Ok(());
            }
            if let Some(child) = children.get_mut(index) {
                if child.is_container() {
                    return insert_block_into(child, pos + 1, registry, at, block);
                }
            }
            return Err(CommandError::InvalidPosition(at));
        }

        pos += size;
        index += 1;
    }

    Err(CommandError::InvalidPosition(at))
}

/// Split a textblock's inline content at a local offset into two blocks of the same type
fn split_textblock(block: &Node, offset: usize) -> (Node, Node) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;

    for child in block.children() {
        let size = child.node_size();
        if pos + size <= offset {
            left.push(child.clone());
        } else if pos >= offset {
            right.push(child.clone());
        } else if let Some(text) = child.text.as_deref() {
            let cut = byte_offset(text, offset - pos);
            left.push(run_with_text(child, &text[..cut]));
            right.push(run_with_text(child, &text[cut..]));
        }
        pos += size;
    }

    let mut first = block.clone();
    first.children = Some(merge_text_runs(left));
    let mut second = block.clone();
    second.children = Some(merge_text_runs(right));
    (first, second)
}

// ---------------------------------------------------------------------------
// Diagrams
// ---------------------------------------------------------------------------

fn carries_id(attrs: &Attrs, id: &DiagramId) -> bool {
    attrs.get(ID_ATTR).and_then(AttrValue::as_text) == Some(id.as_str())
}

fn edit_diagram_source(
    root: &Node,
    registry: &SchemaRegistry,
    id: &DiagramId,
    source: &str,
) -> Result<Node, CommandError> {
    let mut new_root = root.clone();
    let mut set_source = |attrs: &mut Attrs| {
        attrs.insert(SOURCE_ATTR.to_string(), AttrValue::text(source));
    };

    if update_diagrams(&mut new_root, registry, id, &mut set_source) == 0 {
        return Err(CommandError::DiagramNotFound(id.to_string()));
    }
    Ok(new_root)
}

/// Apply `f` to the attributes of every node or mark carrying diagram `id`
fn update_diagrams<F>(node: &mut Node, registry: &SchemaRegistry, id: &DiagramId, f: &mut F) -> usize
where
    F: FnMut(&mut Attrs),
{
    let mut count = 0;

    if registry.is_diagram_node(&node.node_type) && carries_id(&node.attrs, id) {
        f(&mut node.attrs);
        count += 1;
    }
    for mark in node.marks.iter_mut() {
        if registry.is_diagram_mark(&mark.mark_type) && carries_id(&mark.attrs, id) {
            f(&mut mark.attrs);
            count += 1;
        }
    }
    if let Some(children) = node.children_mut() {
        for child in children.iter_mut() {
            count += update_diagrams(child, registry, id, f);
        }
    }

    count
}

fn remove_diagram(root: &Node, registry: &SchemaRegistry, id: &DiagramId) -> Result<Node, CommandError> {
    let mut new_root = root.clone();
    if strip_diagram(&mut new_root, registry, id) == 0 {
        return Err(CommandError::DiagramNotFound(id.to_string()));
    }
    Ok(new_root)
}

fn strip_diagram(node: &mut Node, registry: &SchemaRegistry, id: &DiagramId) -> usize {
    let Some(children) = node.children.take() else {
        return 0;
    };

    let mut removed = 0;
    let mut kept = Vec::with_capacity(children.len());
    for mut child in children {
        if registry.is_diagram_node(&child.node_type) && carries_id(&child.attrs, id) {
            removed += 1;
            continue;
        }

        let before = child.marks.len();
        child
            .marks
            .retain(|mark| !(registry.is_diagram_mark(&mark.mark_type) && carries_id(&mark.attrs, id)));
        removed += before - child.marks.len();

        removed += strip_diagram(&mut child, registry, id);
        kept.push(child);
    }

    node.children = Some(if is_textblock(registry, node) {
        merge_text_runs(kept)
    } else {
        kept
    });
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchbook_schema::rich_text::{BOLD, SUBSCRIPT, SUPERSCRIPT};
    use std::sync::Arc;

    fn state(markup: &str) -> DocumentState {
        crate::document::deserialize(markup, Arc::new(SchemaRegistry::rich_text())).unwrap()
    }

    fn markup(state: &DocumentState) -> String {
        sketchbook_markup::Serializer::new(state.registry())
            .serialize(state.root())
            .replace('\n', "")
            .replace("  ", "")
    }

    #[test]
    fn test_map_runs_splits_at_edges() {
        let children = vec![Node::text("Hello")];
        let (runs, touched) = map_runs(&children, 1, 3, &mut |run: &mut Node| run.marks.push(Mark::new(BOLD)));
        assert_eq!(touched, 1);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].text.as_deref(), Some("el"));
        assert!(runs[1].has_mark(BOLD));
    }

    #[test]
    fn test_set_mark_on_partial_run() {
        let doc = state("<doc><paragraph>Hello</paragraph></doc>");
        let next = apply_command(
            &doc,
            &Command::SetMark { mark: Mark::new(BOLD) },
            Selection::new(2, 4),
        )
        .unwrap();
        assert_eq!(markup(&next), "<doc><paragraph>H<bold>el</bold>lo</paragraph></doc>");
        assert_eq!(next.version(), 1);
    }

    #[test]
    fn test_formatting_cursor_is_empty_selection() {
        let doc = state("<doc><paragraph>Hello</paragraph></doc>");
        let error = apply_command(&doc, &Command::ToggleMark { mark_type: BOLD.into() }, Selection::cursor(2));
        assert_eq!(error.unwrap_err(), CommandError::EmptySelection);
    }

    #[test]
    fn test_selection_over_diagram_only_is_empty() {
        let doc = state(r#"<doc><diagram id="d1" kind="flowchart" source="A-&gt;B"/></doc>"#);
        let error = apply_command(&doc, &Command::ToggleMark { mark_type: BOLD.into() }, Selection::new(0, 1));
        assert_eq!(error.unwrap_err(), CommandError::EmptySelection);
    }

    #[test]
    fn test_subscript_keeps_superscript() {
        let doc = state("<doc><paragraph><superscript>2</superscript></paragraph></doc>");
        let toggle = Command::ToggleMark { mark_type: SUBSCRIPT.into() };
        let next = apply_command(&doc, &toggle, Selection::new(1, 2)).unwrap();
        let run = &next.root().children()[0].children()[0];
        assert!(run.has_mark(SUBSCRIPT));
        assert!(run.has_mark(SUPERSCRIPT));

        let back = apply_command(&next, &toggle, Selection::new(1, 2)).unwrap();
        assert_eq!(back, doc);
    }

    fn exclusive_registry() -> Arc<SchemaRegistry> {
        let mut registry = SchemaRegistry::new().with_top_node("doc");
        registry.register_node_type("doc", sketchbook_schema::NodeSpec::blocks().parents(&[])).unwrap();
        registry.register_node_type("paragraph", sketchbook_schema::NodeSpec::textblock()).unwrap();
        registry
            .register_mark_type("above", sketchbook_schema::MarkSpec::new().excludes(&["below"]))
            .unwrap();
        registry.register_mark_type("below", sketchbook_schema::MarkSpec::new()).unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_toggle_refuses_to_drop_exclusive_mark() {
        let doc = crate::document::deserialize("<doc><paragraph><below>x</below>y</paragraph></doc>", exclusive_registry())
            .unwrap();
        let error = apply_command(
            &doc,
            &Command::ToggleMark { mark_type: "above".into() },
            Selection::new(1, 3),
        )
        .unwrap_err();
        assert_eq!(
            error,
            CommandError::Validation(ValidationError::ExclusiveMarks {
                first: "below".to_string(),
                second: "above".to_string(),
            })
        );
    }

    #[test]
    fn test_set_mark_replaces_exclusive_mark() {
        let doc = crate::document::deserialize("<doc><paragraph><below>x</below></paragraph></doc>", exclusive_registry())
            .unwrap();
        let next = apply_command(
            &doc,
            &Command::SetMark { mark: Mark::new("above") },
            Selection::new(1, 2),
        )
        .unwrap();
        let run = &next.root().children()[0].children()[0];
        assert!(run.has_mark("above"));
        assert!(!run.has_mark("below"));
    }

    #[test]
    fn test_set_font_size_rejects_non_positive() {
        let doc = state("<doc><paragraph>Hello</paragraph></doc>");
        let error = apply_command(
            &doc,
            &Command::SetFontSize { size: Length::pt(0.0) },
            Selection::new(1, 6),
        )
        .unwrap_err();
        assert!(matches!(error, CommandError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_toggle_mark_with_required_attr_fails() {
        let doc = state("<doc><paragraph>Hello</paragraph></doc>");
        let error = apply_command(&doc, &Command::ToggleMark { mark_type: "color".into() }, Selection::new(1, 6))
            .unwrap_err();
        assert!(matches!(error, CommandError::Validation(_)));
    }

    #[test]
    fn test_insert_text_inherits_left_marks() {
        let doc = state("<doc><paragraph><bold>ab</bold>cd</paragraph></doc>");
        let next = apply_command(&doc, &Command::InsertText { text: "X".into() }, Selection::cursor(3)).unwrap();
        assert_eq!(markup(&next), "<doc><paragraph><bold>abX</bold>cd</paragraph></doc>");
    }

    #[test]
    fn test_insert_text_replaces_selection() {
        let doc = state("<doc><paragraph>Hello</paragraph></doc>");
        let next = apply_command(&doc, &Command::InsertText { text: "ipp".into() }, Selection::new(6, 2)).unwrap();
        assert_eq!(next.text_content(), "Hipp");
    }

    #[test]
    fn test_insert_text_outside_textblock() {
        let doc = state("<doc><paragraph>Hi</paragraph><horizontal_rule/></doc>");
        let error = apply_command(&doc, &Command::InsertText { text: "x".into() }, Selection::cursor(5)).unwrap_err();
        assert_eq!(error, CommandError::InvalidPosition(5));
    }

    #[test]
    fn test_delete_range_across_blocks() {
        let doc = state(concat!(
            "<doc><paragraph>Hello</paragraph>",
            "<diagram id=\"d1\" kind=\"flowchart\" source=\"A\"/>",
            "<paragraph>World</paragraph></doc>",
        ));
        // "llo" + diagram + "Wo"
        let next = apply_command(&doc, &Command::DeleteRange, Selection::new(3, 11)).unwrap();
        assert_eq!(
            markup(&next),
            "<doc><paragraph>He</paragraph><paragraph>rld</paragraph></doc>"
        );
    }

    #[test]
    fn test_delete_removes_inline_atoms() {
        let doc = state("<doc><paragraph>a<hard_break/>b</paragraph></doc>");
        let next = apply_command(&doc, &Command::DeleteRange, Selection::new(2, 3)).unwrap();
        assert_eq!(markup(&next), "<doc><paragraph>ab</paragraph></doc>");
    }

    #[test]
    fn test_set_block_type_at_cursor() {
        let doc = state("<doc><paragraph>Title</paragraph><paragraph>Body</paragraph></doc>");
        let mut attrs = Attrs::new();
        attrs.insert("level".into(), AttrValue::Integer(2));
        let next = apply_command(
            &doc,
            &Command::SetBlockType {
                node_type: "heading".into(),
                attrs,
            },
            Selection::cursor(3),
        )
        .unwrap();
        assert_eq!(
            markup(&next),
            "<doc><heading level=\"2\">Title</heading><paragraph>Body</paragraph></doc>"
        );
    }

    #[test]
    fn test_set_block_type_rejects_non_textblock() {
        let doc = state("<doc><paragraph>x</paragraph></doc>");
        let error = apply_command(
            &doc,
            &Command::SetBlockType {
                node_type: "blockquote".into(),
                attrs: Attrs::new(),
            },
            Selection::cursor(1),
        )
        .unwrap_err();
        assert_eq!(error, CommandError::InvalidBlockType("blockquote".into()));
    }

    #[test]
    fn test_insert_diagram_at_block_boundary() {
        let doc = state("<doc><paragraph>Hi</paragraph></doc>");
        let next = apply_command(
            &doc,
            &Command::InsertDiagramBlock {
                id: "d1".into(),
                kind: DiagramKind::Flowchart,
                source: "A->B".into(),
            },
            Selection::cursor(4),
        )
        .unwrap();
        assert_eq!(next.root().children()[1].node_type, DIAGRAM);
    }

    #[test]
    fn test_edit_and_remove_inline_diagram() {
        let doc = state("<doc><paragraph>see flow</paragraph></doc>");
        let with_mark = apply_command(
            &doc,
            &Command::SetDiagramMark {
                id: "d2".into(),
                kind: DiagramKind::Flowchart,
                source: "X->Y".into(),
            },
            Selection::new(5, 9),
        )
        .unwrap();
        assert_eq!(with_mark.diagrams()[0].position, 5);

        let edited = apply_command(
            &with_mark,
            &Command::EditDiagramSource {
                id: "d2".into(),
                source: "X->Z".into(),
            },
            Selection::default(),
        )
        .unwrap();
        assert_eq!(edited.diagrams()[0].source_text, "X->Z");
        assert_eq!(edited.diagrams()[0].id, DiagramId::from("d2"));

        let removed = apply_command(&edited, &Command::RemoveDiagram { id: "d2".into() }, Selection::default()).unwrap();
        assert!(removed.diagrams().is_empty());
        assert_eq!(removed, doc);
    }

    #[test]
    fn test_missing_diagram() {
        let doc = state("<doc><paragraph>x</paragraph></doc>");
        let error = apply_command(&doc, &Command::RemoveDiagram { id: "nope".into() }, Selection::default())
            .unwrap_err();
        assert_eq!(error, CommandError::DiagramNotFound("nope".into()));
    }

    #[test]
    fn test_command_serde_shape() {
        let command = Command::ToggleMark { mark_type: BOLD.into() };
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(json, r#"{"type":"toggleMark","mark_type":"bold"}"#);
    }
}
