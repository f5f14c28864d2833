//! # Schema Registry
//!
//! Declares which node and mark types exist, what attributes they carry and
//! where they may appear.
//!
//! ## Design
//!
//! - Registration is the only place a [`SchemaError`] can occur. A registry
//!   that built successfully never fails later for configuration reasons.
//! - Validation is deep: `validate_node` checks a node and its whole subtree.
//! - The command layer validates everything it builds, the markup layer
//!   validates everything it loads. Both go through this registry.
//! - Node and mark ids share one namespace.
//! - `text` and `unknown` are built in. `unknown` is an opaque leaf used to
//!   carry content from a newer schema without losing it.

use crate::attrs::{AttrSpec, AttrType, Attrs};
use crate::diagram::{DiagramKind, DiagramSource, ID_ATTR, KIND_ATTR, SOURCE_ATTR};
use crate::error::{SchemaError, ValidationError};
use crate::model::{Mark, Node, TEXT_NODE, UNKNOWN_NODE};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const UNKNOWN_TAG_ATTR: &str = "tag";
pub const UNKNOWN_RAW_ATTR: &str = "raw";

/// What a node type holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeContent {
    /// Block-level children
    Blocks,
    /// Inline children (text and inline leaves); a "textblock"
    Inline,
    /// The node is itself a text leaf
    Text,
    /// No content; payload in attributes only
    Atomic,
}

/// Which kind of parent content a node type fits into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroup {
    Block,
    Inline,
    /// Fits anywhere (used for opaque unknown content)
    Opaque,
}

/// Declaration of a node type
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub content: NodeContent,
    pub group: NodeGroup,
    pub attrs: BTreeMap<String, AttrSpec>,
    /// Parent types this node may appear under (`None` = any fitting parent)
    pub allowed_parents: Option<Vec<String>>,
    /// Child types this node accepts (`None` = any fitting child)
    pub allowed_children: Option<Vec<String>>,
    /// Attributes carry a diagram payload
    pub carries_diagram: bool,
}

impl NodeSpec {
    fn new(content: NodeContent, group: NodeGroup) -> Self {
        Self {
            content,
            group,
            attrs: BTreeMap::new(),
            allowed_parents: None,
            allowed_children: None,
            carries_diagram: false,
        }
    }

    /// Block node holding other blocks (doc, blockquote, list items)
    pub fn blocks() -> Self {
        Self::new(NodeContent::Blocks, NodeGroup::Block)
    }

    /// Block node holding inline content (paragraph, heading)
    pub fn textblock() -> Self {
        Self::new(NodeContent::Inline, NodeGroup::Block)
    }

    /// Block-level leaf (horizontal rule, diagram)
    pub fn atomic_block() -> Self {
        Self::new(NodeContent::Atomic, NodeGroup::Block)
    }

    /// Inline leaf (hard break)
    pub fn inline_atom() -> Self {
        Self::new(NodeContent::Atomic, NodeGroup::Inline)
    }

    pub fn attr(mut self, name: &str, spec: AttrSpec) -> Self {
        self.attrs.insert(name.to_string(), spec);
        self
    }

    pub fn parents(mut self, parents: &[&str]) -> Self {
        self.allowed_parents = Some(parents.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn children(mut self, children: &[&str]) -> Self {
        self.allowed_children = Some(children.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Declare the `id`/`kind`/`source` diagram attributes
    pub fn diagram(mut self) -> Self {
        self.carries_diagram = true;
        self.attrs.extend(diagram_attr_specs());
        self
    }

    pub fn is_atomic(&self) -> bool {
        self.content == NodeContent::Atomic
    }

    pub fn is_textblock(&self) -> bool {
        self.content == NodeContent::Inline
    }
}

/// Declaration of a mark type
#[derive(Debug, Clone, Default)]
pub struct MarkSpec {
    pub attrs: BTreeMap<String, AttrSpec>,
    /// Marks that may not share a run with this one
    pub exclusive_with: Vec<String>,
    pub carries_diagram: bool,
}

impl MarkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, spec: AttrSpec) -> Self {
        self.attrs.insert(name.to_string(), spec);
        self
    }

    pub fn excludes(mut self, marks: &[&str]) -> Self {
        self.exclusive_with = marks.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn diagram(mut self) -> Self {
        self.carries_diagram = true;
        self.attrs.extend(diagram_attr_specs());
        self
    }
}

fn diagram_attr_specs() -> Vec<(String, AttrSpec)> {
    vec![
        (ID_ATTR.to_string(), AttrSpec::required(AttrType::Text)),
        (
            KIND_ATTR.to_string(),
            AttrSpec::with_default(
                AttrType::one_of(&DiagramKind::names()),
                DiagramKind::Flowchart.as_str(),
            ),
        ),
        (SOURCE_ATTR.to_string(), AttrSpec::with_default(AttrType::Text, "")),
    ]
}

/// Registry of node and mark types
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    nodes: HashMap<String, NodeSpec>,
    marks: HashMap<String, MarkSpec>,
    /// Registration order; marks on a run are kept in this order
    mark_order: Vec<String>,
    top_node: String,
}

impl SchemaRegistry {
    /// Registry holding only the built-in `text` and `unknown` types
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            TEXT_NODE.to_string(),
            NodeSpec::new(NodeContent::Text, NodeGroup::Inline),
        );
        nodes.insert(
            UNKNOWN_NODE.to_string(),
            NodeSpec::new(NodeContent::Atomic, NodeGroup::Opaque)
                .attr(UNKNOWN_TAG_ATTR, AttrSpec::required(AttrType::Text))
                .attr(UNKNOWN_RAW_ATTR, AttrSpec::required(AttrType::Text)),
        );

        Self {
            nodes,
            marks: HashMap::new(),
            mark_order: Vec::new(),
            top_node: "doc".to_string(),
        }
    }

    /// Set the node type every document must be rooted at
    pub fn with_top_node(mut self, node_type: impl Into<String>) -> Self {
        self.top_node = node_type.into();
        self
    }

    pub fn top_node(&self) -> &str {
        &self.top_node
    }

    pub fn register_node_type(&mut self, id: &str, spec: NodeSpec) -> Result<(), SchemaError> {
        if id == TEXT_NODE || id == UNKNOWN_NODE {
            return Err(SchemaError::ReservedType(id.to_string()));
        }
        self.check_unused(id)?;
        check_defaults(id, &spec.attrs)?;

        self.nodes.insert(id.to_string(), spec);
        Ok(())
    }

    pub fn register_mark_type(&mut self, id: &str, spec: MarkSpec) -> Result<(), SchemaError> {
        self.check_unused(id)?;
        check_defaults(id, &spec.attrs)?;

        self.marks.insert(id.to_string(), spec);
        self.mark_order.push(id.to_string());
        Ok(())
    }

    fn check_unused(&self, id: &str) -> Result<(), SchemaError> {
        if self.nodes.contains_key(id) || self.marks.contains_key(id) {
            return Err(SchemaError::DuplicateType(id.to_string()));
        }
        Ok(())
    }

    pub fn node_spec(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.get(id)
    }

    pub fn mark_spec(&self, id: &str) -> Option<&MarkSpec> {
        self.marks.get(id)
    }

    pub fn has_node_type(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn has_mark_type(&self, id: &str) -> bool {
        self.marks.contains_key(id)
    }

    /// Mark types in registration order
    pub fn mark_types(&self) -> impl Iterator<Item = &str> {
        self.mark_order.iter().map(String::as_str)
    }

    /// Position of a mark type in the canonical run order
    pub fn mark_rank(&self, id: &str) -> Option<usize> {
        self.mark_order.iter().position(|m| m == id)
    }

    /// Put marks into canonical (registration) order
    pub fn sort_marks(&self, marks: &mut [Mark]) {
        marks.sort_by_key(|m| self.mark_rank(&m.mark_type).unwrap_or(usize::MAX));
    }

    /// Mark types that may not share a run with `id` (in either direction)
    pub fn exclusions_of(&self, id: &str) -> Vec<String> {
        let mut excluded: Vec<String> = self
            .marks
            .get(id)
            .map(|spec| spec.exclusive_with.clone())
            .unwrap_or_default();

        for (other, spec) in &self.marks {
            if spec.exclusive_with.iter().any(|m| m == id) && !excluded.contains(other) {
                excluded.push(other.clone());
            }
        }

        excluded
    }

    pub fn is_diagram_mark(&self, id: &str) -> bool {
        self.marks.get(id).map(|s| s.carries_diagram).unwrap_or(false)
    }

    pub fn is_diagram_node(&self, id: &str) -> bool {
        self.nodes.get(id).map(|s| s.carries_diagram).unwrap_or(false)
    }

    /// Fill declared defaults into a node's attributes and check the result
    pub fn resolve_node_attrs(&self, node_type: &str, attrs: Attrs) -> Result<Attrs, ValidationError> {
        let spec = self
            .node_spec(node_type)
            .ok_or_else(|| ValidationError::UnknownNodeType(node_type.to_string()))?;
        resolve_attrs(node_type, &spec.attrs, attrs)
    }

    /// Build a mark with defaults filled in, validated
    pub fn create_mark(&self, mark_type: &str, attrs: Attrs) -> Result<Mark, ValidationError> {
        let spec = self
            .mark_spec(mark_type)
            .ok_or_else(|| ValidationError::UnknownMarkType(mark_type.to_string()))?;
        let attrs = resolve_attrs(mark_type, &spec.attrs, attrs)?;

        let mark = Mark {
            mark_type: mark_type.to_string(),
            attrs,
        };
        self.validate_mark(&mark)?;
        Ok(mark)
    }

    /// Build an atomic leaf with defaults filled in, validated
    pub fn create_atom(&self, node_type: &str, attrs: Attrs) -> Result<Node, ValidationError> {
        let attrs = self.resolve_node_attrs(node_type, attrs)?;
        let node = Node::atom(node_type, attrs);
        self.validate_node(&node)?;
        Ok(node)
    }

    /// Build a container with defaults filled in, validated
    pub fn create_container(
        &self,
        node_type: &str,
        attrs: Attrs,
        children: Vec<Node>,
    ) -> Result<Node, ValidationError> {
        let mut node = Node::container(node_type, children);
        node.attrs = self.resolve_node_attrs(node_type, attrs)?;
        self.validate_node(&node)?;
        Ok(node)
    }

    pub fn validate_mark(&self, mark: &Mark) -> Result<(), ValidationError> {
        let spec = self
            .mark_spec(&mark.mark_type)
            .ok_or_else(|| ValidationError::UnknownMarkType(mark.mark_type.clone()))?;

        check_attrs(&mark.mark_type, &spec.attrs, &mark.attrs)?;
        if spec.carries_diagram {
            check_diagram_attrs(&mark.mark_type, &mark.attrs)?;
        }
        Ok(())
    }

    /// Validate a node and its whole subtree
    pub fn validate_node(&self, node: &Node) -> Result<(), ValidationError> {
        let spec = self
            .node_spec(&node.node_type)
            .ok_or_else(|| ValidationError::UnknownNodeType(node.node_type.clone()))?;

        check_attrs(&node.node_type, &spec.attrs, &node.attrs)?;
        check_shape(node, spec)?;

        if spec.carries_diagram {
            check_diagram_attrs(&node.node_type, &node.attrs)?;
        }

        if !node.marks.is_empty() {
            self.validate_marks(&node.marks)?;
        }

        for child in node.children() {
            self.check_child(&node.node_type, spec, child)?;
            self.validate_node(child)?;
        }

        Ok(())
    }

    /// Validate the set of marks on one run
    pub fn validate_marks(&self, marks: &[Mark]) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for mark in marks {
            self.validate_mark(mark)?;
            if !seen.insert(mark.mark_type.as_str()) {
                return Err(ValidationError::DuplicateMark(mark.mark_type.clone()));
            }
        }

        for mark in marks {
            for excluded in self.exclusions_of(&mark.mark_type) {
                if seen.contains(excluded.as_str()) {
                    return Err(ValidationError::ExclusiveMarks {
                        first: mark.mark_type.clone(),
                        second: excluded,
                    });
                }
            }
        }

        Ok(())
    }

    /// Validate a whole document: root type, subtree, diagram id uniqueness
    pub fn validate_document(&self, root: &Node) -> Result<(), ValidationError> {
        if root.node_type != self.top_node {
            return Err(ValidationError::InvalidRoot {
                expected: self.top_node.clone(),
                found: root.node_type.clone(),
            });
        }

        self.validate_node(root)?;
        self.check_unique_diagrams(root, &mut HashSet::new())
    }

    fn check_child(&self, parent_type: &str, parent: &NodeSpec, child: &Node) -> Result<(), ValidationError> {
        let child_spec = self
            .node_spec(&child.node_type)
            .ok_or_else(|| ValidationError::UnknownNodeType(child.node_type.clone()))?;

        let disallowed = || ValidationError::DisallowedChild {
            parent: parent_type.to_string(),
            child: child.node_type.clone(),
        };

        if child_spec.group == NodeGroup::Opaque {
            return Ok(());
        }

        let fits = matches!(
            (parent.content, child_spec.group),
            (NodeContent::Blocks, NodeGroup::Block) | (NodeContent::Inline, NodeGroup::Inline)
        );
        if !fits {
            return Err(disallowed());
        }

        if let Some(children) = &parent.allowed_children {
            if !children.iter().any(|c| c == &child.node_type) {
                return Err(disallowed());
            }
        }

        if let Some(parents) = &child_spec.allowed_parents {
            if !parents.iter().any(|p| p == parent_type) {
                return Err(disallowed());
            }
        }

        Ok(())
    }

    /// Whether `child_type` may be placed directly under `parent_type`
    pub fn can_contain(&self, parent_type: &str, child_type: &str) -> bool {
        let Some(parent) = self.node_spec(parent_type) else {
            return false;
        };
        let candidate = Node::atom(child_type, Attrs::new());
        self.check_child(parent_type, parent, &candidate).is_ok()
    }

    fn check_unique_diagrams(&self, node: &Node, seen: &mut HashSet<String>) -> Result<(), ValidationError> {
        let mut previous_run: Vec<String> = Vec::new();

        for child in node.children() {
            if self.is_diagram_node(&child.node_type) {
                if let Some(source) = child.diagram_source() {
                    if !seen.insert(source.id.as_str().to_string()) {
                        return Err(ValidationError::DuplicateDiagramId(source.id.to_string()));
                    }
                }
            }

            // Adjacent runs sharing an inline diagram id are one diagram
            let run: Vec<String> = child
                .marks
                .iter()
                .filter(|m| self.is_diagram_mark(&m.mark_type))
                .filter_map(|m| m.diagram_source())
                .map(|s| s.id.as_str().to_string())
                .collect();
            for id in &run {
                if !previous_run.contains(id) && !seen.insert(id.clone()) {
                    return Err(ValidationError::DuplicateDiagramId(id.clone()));
                }
            }
            previous_run = run;

            self.check_unique_diagrams(child, seen)?;
        }

        Ok(())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn check_defaults(owner: &str, specs: &BTreeMap<String, AttrSpec>) -> Result<(), SchemaError> {
    for (name, spec) in specs {
        if let Some(default) = &spec.default {
            spec.ty
                .check(default)
                .map_err(|reason| SchemaError::IncompatibleDefault {
                    owner: owner.to_string(),
                    attr: name.clone(),
                    reason,
                })?;
        }
    }
    Ok(())
}

fn resolve_attrs(
    owner: &str,
    specs: &BTreeMap<String, AttrSpec>,
    mut attrs: Attrs,
) -> Result<Attrs, ValidationError> {
    for (name, spec) in specs {
        if !attrs.contains_key(name) {
            if let Some(default) = &spec.default {
                attrs.insert(name.clone(), default.clone());
            }
        }
    }
    check_attrs(owner, specs, &attrs)?;
    Ok(attrs)
}

fn check_attrs(owner: &str, specs: &BTreeMap<String, AttrSpec>, attrs: &Attrs) -> Result<(), ValidationError> {
    for (name, value) in attrs {
        let spec = specs.get(name).ok_or_else(|| ValidationError::UnknownAttribute {
            owner: owner.to_string(),
            name: name.clone(),
        })?;

        spec.ty
            .check(value)
            .map_err(|reason| ValidationError::InvalidAttribute {
                owner: owner.to_string(),
                name: name.clone(),
                reason,
            })?;
    }

    for (name, spec) in specs {
        if spec.is_required() && !attrs.contains_key(name) {
            return Err(ValidationError::MissingAttribute {
                owner: owner.to_string(),
                name: name.clone(),
            });
        }
    }

    Ok(())
}

fn check_shape(node: &Node, spec: &NodeSpec) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidShape {
        node_type: node.node_type.clone(),
        reason: reason.to_string(),
    };

    match spec.content {
        NodeContent::Text => {
            if node.children.is_some() {
                return Err(invalid("text leaves cannot have children"));
            }
            match &node.text {
                Some(text) if text.is_empty() => return Err(invalid("text leaves cannot be empty")),
                Some(_) => {}
                None => return Err(invalid("text leaves must carry text")),
            }
        }
        NodeContent::Atomic => {
            if node.children.is_some() || node.text.is_some() {
                return Err(invalid("atomic leaves carry neither children nor text"));
            }
        }
        NodeContent::Blocks | NodeContent::Inline => {
            if node.text.is_some() {
                return Err(invalid("containers cannot carry text"));
            }
            if node.children.is_none() {
                return Err(invalid("containers must have a child list"));
            }
        }
    }

    // Opaque leaves keep the marks they were found under
    let can_carry_marks = spec.content == NodeContent::Text || spec.group == NodeGroup::Opaque;
    if !can_carry_marks && !node.marks.is_empty() {
        return Err(invalid("only text leaves carry marks"));
    }

    Ok(())
}

fn check_diagram_attrs(owner: &str, attrs: &Attrs) -> Result<(), ValidationError> {
    match DiagramSource::from_attrs(attrs) {
        Some(source) if !source.id.as_str().is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidAttribute {
            owner: owner.to_string(),
            name: ID_ATTR.to_string(),
            reason: "diagram id must not be empty".to_string(),
        }),
    }
}
