//! # Document Tree
//!
//! Nodes and marks making up one section's content.
//!
//! ## Shape
//!
//! A node is one of:
//! - a **container**: `children` is populated
//! - a **text leaf**: `text` is populated, and it may carry marks
//! - an **atomic leaf**: neither is populated, the payload lives in `attrs`
//!
//! ## Positions
//!
//! Positions are flat offsets into the root's content. Entering or leaving a
//! container counts 1, each text character counts 1 and each atomic leaf
//! counts 1.
//!
//! ```text
//! <doc> <paragraph> H i </paragraph> <diagram/> </doc>
//!      0           1 2 3            4          5
//! ```

use crate::attrs::{AttrValue, Attrs};
use crate::diagram::DiagramSource;
use serde::{Deserialize, Serialize};

pub const TEXT_NODE: &str = "text";
pub const UNKNOWN_NODE: &str = "unknown";

/// Inline annotation on a run of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub mark_type: String,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(mark_type: impl Into<String>) -> Self {
        Self {
            mark_type: mark_type.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn diagram_source(&self) -> Option<DiagramSource> {
        DiagramSource::from_attrs(&self.attrs)
    }
}

/// Structural unit of the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_type: String,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    /// Container node with the given children
    pub fn container(node_type: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            node_type: node_type.into(),
            attrs: Attrs::new(),
            children: Some(children),
            text: None,
            marks: Vec::new(),
        }
    }

    /// Unmarked text leaf
    pub fn text(text: impl Into<String>) -> Self {
        Self::marked_text(text, Vec::new())
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            node_type: TEXT_NODE.to_string(),
            attrs: Attrs::new(),
            children: None,
            text: Some(text.into()),
            marks,
        }
    }

    /// Atomic leaf whose payload lives entirely in its attributes
    pub fn atom(node_type: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            node_type: node_type.into(),
            attrs,
            children: None,
            text: None,
            marks: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_container()
    }

    /// Children, or an empty slice for leaves
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        self.children.as_mut()
    }

    pub fn has_mark(&self, mark_type: &str) -> bool {
        self.mark(mark_type).is_some()
    }

    pub fn mark(&self, mark_type: &str) -> Option<&Mark> {
        self.marks.iter().find(|m| m.mark_type == mark_type)
    }

    /// Number of characters in a text leaf (0 for other nodes)
    pub fn text_len(&self) -> usize {
        self.text.as_deref().map(|t| t.chars().count()).unwrap_or(0)
    }

    /// Size of this node in position units
    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.text_len()
        } else if self.is_container() {
            self.content_size() + 2
        } else {
            1
        }
    }

    /// Size of this node's content in position units
    pub fn content_size(&self) -> usize {
        self.children().iter().map(Node::node_size).sum()
    }

    /// Concatenated text of all descendant text leaves
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }

    /// Diagram payload if this node's attributes carry one
    pub fn diagram_source(&self) -> Option<DiagramSource> {
        DiagramSource::from_attrs(&self.attrs)
    }

    /// Visit every descendant in document order with its start position
    ///
    /// Positions are relative to the start of this node's content.
    pub fn for_each_descendant<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize),
    {
        let mut pos = 0;
        for child in self.children() {
            child.walk(pos, f);
            pos += child.node_size();
        }
    }

    fn walk<F>(&self, pos: usize, f: &mut F)
    where
        F: FnMut(&Node, usize),
    {
        f(self, pos);

        let mut child_pos = pos + 1;
        for child in self.children() {
            child.walk(child_pos, f);
            child_pos += child.node_size();
        }
    }

    /// Find the first descendant (in document order) matching a predicate
    pub fn find<P>(&self, mut predicate: P) -> Option<(&Node, usize)>
    where
        P: FnMut(&Node) -> bool,
    {
        find_in(self, 0, &mut predicate)
    }
}

fn find_in<'a, P>(node: &'a Node, start: usize, predicate: &mut P) -> Option<(&'a Node, usize)>
where
    P: FnMut(&Node) -> bool,
{
    let mut pos = start;
    for child in node.children() {
        if predicate(child) {
            return Some((child, pos));
        }
        if let Some(found) = find_in(child, pos + 1, predicate) {
            return Some(found);
        }
        pos += child.node_size();
    }
    None
}

/// Merge adjacent text leaves carrying identical marks and drop empty ones
pub fn merge_text_runs(nodes: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());

    for node in nodes {
        if node.is_text() && node.text_len() == 0 {
            continue;
        }

        if let Some(last) = merged.last_mut() {
            if last.is_text() && node.is_text() && last.marks == node.marks {
                if let (Some(text), Some(more)) = (last.text.as_mut(), node.text.as_deref()) {
                    text.push_str(more);
                }
                continue;
            }
        }

        merged.push(node);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::container(
            "doc",
            vec![
                Node::container("paragraph", vec![Node::text("Hi")]),
                Node::atom("diagram", Attrs::new()),
            ],
        )
    }

    #[test]
    fn test_node_sizes() {
        let doc = sample();
        assert_eq!(doc.children()[0].node_size(), 4);
        assert_eq!(doc.children()[1].node_size(), 1);
        assert_eq!(doc.content_size(), 5);
    }

    #[test]
    fn test_descendant_positions() {
        let doc = sample();
        let mut seen = Vec::new();
        doc.for_each_descendant(&mut |node, pos| seen.push((node.node_type.clone(), pos)));

        assert_eq!(
            seen,
            vec![
                ("paragraph".to_string(), 0),
                ("text".to_string(), 1),
                ("diagram".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_text_len_counts_chars() {
        let node = Node::text("héllo");
        assert_eq!(node.text_len(), 5);
        assert_eq!(node.node_size(), 5);
    }

    #[test]
    fn test_merge_text_runs() {
        let bold = Mark::new("bold");
        let merged = merge_text_runs(vec![
            Node::marked_text("He", vec![bold.clone()]),
            Node::marked_text("llo", vec![bold.clone()]),
            Node::text(""),
            Node::text(" world"),
            Node::atom("hard_break", Attrs::new()),
            Node::text("!"),
        ]);

        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0], Node::marked_text("Hello", vec![bold]));
        assert_eq!(merged[1], Node::text(" world"));
    }

    #[test]
    fn test_find_nested_node() {
        let doc = sample();
        let (node, pos) = doc.find(|n| n.is_text()).unwrap();
        assert_eq!(node.text.as_deref(), Some("Hi"));
        assert_eq!(pos, 1);

        let (node, pos) = doc.find(|n| n.node_type == "diagram").unwrap();
        assert_eq!(node.node_type, "diagram");
        assert_eq!(pos, 4);
    }
}
