//! # Rich Text Schema
//!
//! The default schema used by sections: ordinary formatted text, lists,
//! tables, code blocks and embedded diagrams.

use crate::attrs::{AttrSpec, AttrType};
use crate::error::SchemaError;
use crate::registry::{MarkSpec, NodeSpec, SchemaRegistry};

pub const DOC: &str = "doc";
pub const PARAGRAPH: &str = "paragraph";
pub const HEADING: &str = "heading";
pub const BLOCKQUOTE: &str = "blockquote";
pub const BULLET_LIST: &str = "bullet_list";
pub const ORDERED_LIST: &str = "ordered_list";
pub const LIST_ITEM: &str = "list_item";
pub const TABLE: &str = "table";
pub const TABLE_ROW: &str = "table_row";
pub const TABLE_CELL: &str = "table_cell";
pub const CODE_BLOCK: &str = "code_block";
pub const HORIZONTAL_RULE: &str = "horizontal_rule";
pub const HARD_BREAK: &str = "hard_break";
pub const DIAGRAM: &str = "diagram";

pub const BOLD: &str = "bold";
pub const ITALIC: &str = "italic";
pub const UNDERLINE: &str = "underline";
pub const STRIKE: &str = "strike";
pub const CODE: &str = "code";
pub const COLOR: &str = "color";
pub const HIGHLIGHT: &str = "highlight";
pub const FONT_SIZE: &str = "font_size";
pub const SUBSCRIPT: &str = "subscript";
pub const SUPERSCRIPT: &str = "superscript";
pub const LINK: &str = "link";
pub const INLINE_DIAGRAM: &str = "inline_diagram";

/// Attribute of `font_size` holding the [`Length`](crate::attrs::Length)
pub const SIZE_ATTR: &str = "size";

impl SchemaRegistry {
    /// Registry with the built-in rich text schema
    pub fn rich_text() -> Self {
        build_rich_text().expect("built-in rich text schema is valid")
    }
}

fn build_rich_text() -> Result<SchemaRegistry, SchemaError> {
    let mut registry = SchemaRegistry::new().with_top_node(DOC);

    // Blocks
    registry.register_node_type(DOC, NodeSpec::blocks().parents(&[]))?;
    registry.register_node_type(PARAGRAPH, NodeSpec::textblock())?;
    registry.register_node_type(
        HEADING,
        NodeSpec::textblock().attr(
            "level",
            AttrSpec::with_default(AttrType::integer_range(1, 6), 1i64),
        ),
    )?;
    registry.register_node_type(BLOCKQUOTE, NodeSpec::blocks())?;
    registry.register_node_type(BULLET_LIST, NodeSpec::blocks().children(&[LIST_ITEM]))?;
    registry.register_node_type(
        ORDERED_LIST,
        NodeSpec::blocks()
            .children(&[LIST_ITEM])
            .attr("start", AttrSpec::with_default(AttrType::integer(), 1i64)),
    )?;
    registry.register_node_type(
        LIST_ITEM,
        NodeSpec::blocks().parents(&[BULLET_LIST, ORDERED_LIST]),
    )?;
    registry.register_node_type(TABLE, NodeSpec::blocks().children(&[TABLE_ROW]))?;
    registry.register_node_type(
        TABLE_ROW,
        NodeSpec::blocks().parents(&[TABLE]).children(&[TABLE_CELL]),
    )?;

    let span = || AttrSpec::with_default(AttrType::integer_range(1, 1000), 1i64);
    registry.register_node_type(
        TABLE_CELL,
        NodeSpec::blocks()
            .parents(&[TABLE_ROW])
            .attr("colspan", span())
            .attr("rowspan", span()),
    )?;
    registry.register_node_type(
        CODE_BLOCK,
        NodeSpec::textblock()
            .children(&["text"])
            .attr("language", AttrSpec::with_default(AttrType::Text, "")),
    )?;
    registry.register_node_type(HORIZONTAL_RULE, NodeSpec::atomic_block())?;
    registry.register_node_type(DIAGRAM, NodeSpec::atomic_block().diagram())?;

    // Inline leaves
    registry.register_node_type(HARD_BREAK, NodeSpec::inline_atom())?;

    // Marks, in canonical nesting order
    registry.register_mark_type(
        LINK,
        MarkSpec::new()
            .attr("href", AttrSpec::required(AttrType::Text))
            .attr("title", AttrSpec::with_default(AttrType::Text, "")),
    )?;
    registry.register_mark_type(BOLD, MarkSpec::new())?;
    registry.register_mark_type(ITALIC, MarkSpec::new())?;
    registry.register_mark_type(UNDERLINE, MarkSpec::new())?;
    registry.register_mark_type(STRIKE, MarkSpec::new())?;
    registry.register_mark_type(CODE, MarkSpec::new())?;
    registry.register_mark_type(
        COLOR,
        MarkSpec::new().attr("value", AttrSpec::required(AttrType::Text)),
    )?;
    registry.register_mark_type(
        HIGHLIGHT,
        MarkSpec::new().attr("color", AttrSpec::with_default(AttrType::Text, "yellow")),
    )?;
    registry.register_mark_type(
        FONT_SIZE,
        MarkSpec::new().attr(SIZE_ATTR, AttrSpec::required(AttrType::Length)),
    )?;
    registry.register_mark_type(SUBSCRIPT, MarkSpec::new())?;
    registry.register_mark_type(SUPERSCRIPT, MarkSpec::new())?;
    registry.register_mark_type(INLINE_DIAGRAM, MarkSpec::new().diagram())?;

    Ok(registry)
}
