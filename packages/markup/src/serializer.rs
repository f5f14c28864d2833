use sketchbook_schema::registry::UNKNOWN_RAW_ATTR;
use sketchbook_schema::{Attrs, Mark, Node, NodeContent, SchemaRegistry, UNKNOWN_NODE};

/// Serializer converts a document tree back to section markup
///
/// Block containers are written one child per line with indentation.
/// Textblocks are written on a single line, since whitespace inside them is
/// content. Marks are written as elements wrapping the runs they cover,
/// reusing an open mark element across adjacent runs that share it.
///
/// Every attribute is written, defaults included, so reading the output back
/// yields the same tree.
pub struct Serializer<'a> {
    registry: &'a SchemaRegistry,
    indent_level: usize,
    indent_string: String,
}

impl<'a> Serializer<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            indent_level: 0,
            indent_string: "  ".to_string(), // 2 spaces
        }
    }

    pub fn with_indent(registry: &'a SchemaRegistry, indent: &str) -> Self {
        Self {
            registry,
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a document root to markup
    pub fn serialize(&mut self, root: &Node) -> String {
        let mut output = String::new();
        self.serialize_block(root, &mut output);
        output
    }

    fn serialize_block(&mut self, node: &Node, output: &mut String) {
        self.push_indent(output);

        if node.node_type == UNKNOWN_NODE {
            output.push_str(raw_of(node));
            output.push('\n');
            return;
        }

        let content = self
            .registry
            .node_spec(&node.node_type)
            .map(|spec| spec.content)
            .unwrap_or(if node.is_container() {
                NodeContent::Blocks
            } else {
                NodeContent::Atomic
            });

        match content {
            NodeContent::Atomic => {
                write_open_tag(&node.node_type, &node.attrs, true, output);
            }
            NodeContent::Text => {
                output.push_str(&escape_text(node.text.as_deref().unwrap_or("")));
            }
            NodeContent::Inline => {
                write_open_tag(&node.node_type, &node.attrs, false, output);
                self.serialize_inline(node.children(), output);
                write_close_tag(&node.node_type, output);
            }
            NodeContent::Blocks => {
                write_open_tag(&node.node_type, &node.attrs, false, output);
                if !node.children().is_empty() {
                    output.push('\n');
                    self.indent_level += 1;
                    for child in node.children() {
                        self.serialize_block(child, output);
                    }
                    self.indent_level -= 1;
                    self.push_indent(output);
                }
                write_close_tag(&node.node_type, output);
            }
        }

        output.push('\n');
    }

    fn serialize_inline(&self, children: &[Node], output: &mut String) {
        let mut open: Vec<&Mark> = Vec::new();

        for child in children {
            let marks: &[Mark] = &child.marks;

            // Keep the open marks this run shares, close the rest
            let keep = open
                .iter()
                .zip(marks.iter())
                .take_while(|(open_mark, mark)| **open_mark == *mark)
                .count();
            while open.len() > keep {
                if let Some(mark) = open.pop() {
                    write_close_tag(&mark.mark_type, output);
                }
            }
            for mark in &marks[keep..] {
                write_open_tag(&mark.mark_type, &mark.attrs, false, output);
                open.push(mark);
            }

            if let Some(text) = &child.text {
                output.push_str(&escape_text(text));
            } else if child.node_type == UNKNOWN_NODE {
                output.push_str(raw_of(child));
            } else {
                write_open_tag(&child.node_type, &child.attrs, true, output);
            }
        }

        while let Some(mark) = open.pop() {
            write_close_tag(&mark.mark_type, output);
        }
    }

    fn push_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

fn raw_of(node: &Node) -> &str {
    node.attr(UNKNOWN_RAW_ATTR)
        .and_then(|value| value.as_text())
        .unwrap_or("")
}

fn write_open_tag(name: &str, attrs: &Attrs, self_closing: bool, output: &mut String) {
    output.push('<');
    output.push_str(name);
    for (attr, value) in attrs {
        output.push(' ');
        output.push_str(attr);
        output.push_str("=\"");
        output.push_str(&escape_attr(&value.to_string()));
        output.push('"');
    }
    output.push_str(if self_closing { "/>" } else { ">" });
}

fn write_close_tag(name: &str, output: &mut String) {
    output.push_str("</");
    output.push_str(name);
    output.push('>');
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Convenience function to serialize a document root
pub fn serialize(root: &Node, registry: &SchemaRegistry) -> String {
    Serializer::new(registry).serialize(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchbook_schema::{DiagramKind, DiagramSource, Length};

    #[test]
    fn test_serialize_blocks_with_indent() {
        let registry = SchemaRegistry::rich_text();
        let doc = Node::container(
            "doc",
            vec![
                Node::container("paragraph", vec![Node::text("Hi")]),
                Node::atom("horizontal_rule", Attrs::new()),
            ],
        );

        assert_eq!(
            serialize(&doc, &registry),
            "<doc>\n  <paragraph>Hi</paragraph>\n  <horizontal_rule/>\n</doc>\n"
        );
    }

    #[test]
    fn test_serialize_empty_containers() {
        let registry = SchemaRegistry::rich_text();
        let doc = Node::container("doc", vec![Node::container("paragraph", vec![])]);
        assert_eq!(
            serialize(&doc, &registry),
            "<doc>\n  <paragraph></paragraph>\n</doc>\n"
        );
    }

    #[test]
    fn test_adjacent_runs_share_mark_element() {
        let registry = SchemaRegistry::rich_text();
        let bold = Mark::new("bold");
        let italic = Mark::new("italic");
        let para = Node::container(
            "paragraph",
            vec![
                Node::marked_text("a", vec![bold.clone()]),
                Node::marked_text("b", vec![bold.clone(), italic]),
                Node::text("c"),
            ],
        );

        assert_eq!(
            Serializer::new(&registry).serialize(&para),
            "<paragraph><bold>a<italic>b</italic></bold>c</paragraph>\n"
        );
    }

    #[test]
    fn test_font_size_attribute_written() {
        let registry = SchemaRegistry::rich_text();
        let size = Mark::new("font_size").with_attr("size", Length::pt(18.0));
        let para = Node::container("paragraph", vec![Node::marked_text("Hello World", vec![size])]);

        assert_eq!(
            Serializer::new(&registry).serialize(&para),
            "<paragraph><font_size size=\"18pt\">Hello World</font_size></paragraph>\n"
        );
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let registry = SchemaRegistry::rich_text();
        let diagram = Node::atom(
            "diagram",
            DiagramSource::new("d1", DiagramKind::Flowchart, "A->\"B\" & C").to_attrs(),
        );
        let para = Node::container("paragraph", vec![Node::text("1 < 2")]);

        let mut serializer = Serializer::with_indent(&registry, "\t");
        assert_eq!(
            serializer.serialize(&diagram),
            "<diagram id=\"d1\" kind=\"flowchart\" source=\"A-&gt;&quot;B&quot; &amp; C\"/>\n"
        );
        assert_eq!(serializer.serialize(&para), "<paragraph>1 &lt; 2</paragraph>\n");
    }
}
