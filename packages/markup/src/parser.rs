//! # Markup Parser
//!
//! Reads persisted section markup back into a validated document tree.
//!
//! ## Design
//!
//! Parsing happens in two passes:
//!
//! 1. [`Parser`] turns the token stream into a generic [`Element`] tree.
//!    It knows nothing about the schema, only about well-formed tags.
//! 2. The converter walks the element tree against a [`SchemaRegistry`]:
//!    node elements become nodes, mark elements become marks on the text
//!    runs they wrap, and anything unregistered becomes an opaque `unknown`
//!    leaf holding its raw source.
//!
//! The converter fails closed: an attribute that does not parse, a child in
//! the wrong place or an invalid mark combination aborts the load with a
//! [`ParseError`] pointing at the offending element.

use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};
use sketchbook_schema::registry::{UNKNOWN_RAW_ATTR, UNKNOWN_TAG_ATTR};
use sketchbook_schema::{
    merge_text_runs, AttrSpec, AttrValue, Attrs, Mark, Node, NodeContent, SchemaRegistry,
    ValidationError, TEXT_NODE, UNKNOWN_NODE,
};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

/// One `name="value"` pair of a start tag
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupAttr {
    pub name: String,
    /// Entity-decoded value
    pub value: String,
    pub span: Range<usize>,
}

/// Element of the generic markup tree
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<MarkupAttr>,
    pub children: Vec<Markup>,
    /// Start tag only
    pub open_tag: Range<usize>,
    /// Start tag through end tag
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element(Element),
    Text { text: String, span: Range<usize> },
}

/// Parser for the generic element tree
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    /// Parse a single root element surrounded by optional whitespace
    pub fn parse_document(&mut self) -> ParseResult<Element> {
        self.skip_whitespace();
        let root = self.parse_element()?;
        self.skip_whitespace();

        if let Some((token, span)) = self.peek() {
            return Err(ParseError::unexpected_token(
                span.start,
                "end of input",
                token.to_string(),
            ));
        }

        Ok(root)
    }

    fn parse_element(&mut self) -> ParseResult<Element> {
        let start = self.expect_tag_open()?;
        let (name, _) = self.expect_name("element name")?;

        let mut attrs: Vec<MarkupAttr> = Vec::new();
        let open_end = loop {
            match self.advance() {
                Some((Token::Name(attr_name), span)) => {
                    let attr = self.parse_attr(attr_name, span)?;
                    if attrs.iter().any(|a| a.name == attr.name) {
                        return Err(ParseError::invalid_content(
                            attr.span.start,
                            &self.source[attr.span.clone()],
                            format!("duplicate attribute '{}'", attr.name),
                        ));
                    }
                    attrs.push(attr);
                }
                Some((Token::TagEnd, span)) => break span.end,
                Some((Token::SelfClose, span)) => {
                    return Ok(Element {
                        name: name.to_string(),
                        attrs,
                        children: Vec::new(),
                        open_tag: start..span.end,
                        span: start..span.end,
                    });
                }
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token(
                        span.start,
                        "attribute, '>' or '/>'",
                        token.to_string(),
                    ));
                }
                None => return Err(ParseError::unexpected_eof(self.source.len(), "'>'")),
            }
        };

        let mut children = Vec::new();
        loop {
            match self.peek() {
                Some((Token::Text(_), _)) | Some((Token::Entity(_), _)) => {
                    let (text, span) = self.parse_text()?;
                    children.push(Markup::Text { text, span });
                }
                Some((Token::TagOpen, _)) => {
                    children.push(Markup::Element(self.parse_element()?));
                }
                Some((Token::CloseTagOpen, _)) => {
                    self.advance();
                    let (close_name, close_span) = self.expect_name("closing tag name")?;
                    if close_name != name {
                        return Err(ParseError::MismatchedTag {
                            pos: close_span.start,
                            expected: name.to_string(),
                            found: close_name.to_string(),
                        });
                    }
                    let end = self.expect_tag_end()?;

                    return Ok(Element {
                        name: name.to_string(),
                        attrs,
                        children,
                        open_tag: start..open_end,
                        span: start..end,
                    });
                }
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token(
                        span.start,
                        "content",
                        token.to_string(),
                    ));
                }
                None => {
                    return Err(ParseError::unexpected_eof(
                        self.source.len(),
                        format!("</{}>", name),
                    ));
                }
            }
        }
    }

    fn parse_attr(&mut self, name: &'src str, name_span: Range<usize>) -> ParseResult<MarkupAttr> {
        match self.advance() {
            Some((Token::Equals, _)) => {}
            Some((token, span)) => {
                return Err(ParseError::unexpected_token(span.start, "'='", token.to_string()));
            }
            None => return Err(ParseError::unexpected_eof(self.source.len(), "'='")),
        }

        match self.advance() {
            Some((Token::Value(raw), span)) => Ok(MarkupAttr {
                name: name.to_string(),
                value: unescape(raw, span.start + 1)?,
                span: name_span.start..span.end,
            }),
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.start,
                "quoted value",
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.source.len(), "quoted value")),
        }
    }

    /// Consecutive text and entity tokens as one decoded string
    fn parse_text(&mut self) -> ParseResult<(String, Range<usize>)> {
        let mut text = String::new();
        let mut span: Option<Range<usize>> = None;

        while let Some((token, token_span)) = self.peek() {
            let token_span = token_span.clone();
            match *token {
                Token::Text(raw) => text.push_str(raw),
                Token::Entity(entity) => text.push(decode_entity(entity, token_span.start)?),
                _ => break,
            }
            span = Some(match span {
                Some(existing) => existing.start..token_span.end,
                None => token_span,
            });
            self.advance();
        }

        Ok((text, span.unwrap_or(0..0)))
    }

    fn skip_whitespace(&mut self) {
        while let Some((Token::Text(raw), _)) = self.peek() {
            if !raw.trim().is_empty() {
                break;
            }
            self.advance();
        }
    }

    fn expect_tag_open(&mut self) -> ParseResult<usize> {
        match self.advance() {
            Some((Token::TagOpen, span)) => Ok(span.start),
            Some((token, span)) => Err(ParseError::unexpected_token(span.start, "'<'", token.to_string())),
            None => Err(ParseError::unexpected_eof(self.source.len(), "'<'")),
        }
    }

    fn expect_tag_end(&mut self) -> ParseResult<usize> {
        match self.advance() {
            Some((Token::TagEnd, span)) => Ok(span.end),
            Some((token, span)) => Err(ParseError::unexpected_token(span.start, "'>'", token.to_string())),
            None => Err(ParseError::unexpected_eof(self.source.len(), "'>'")),
        }
    }

    fn expect_name(&mut self, expected: &str) -> ParseResult<(&'src str, Range<usize>)> {
        match self.advance() {
            Some((Token::Name(name), span)) => Ok((name, span)),
            Some((token, span)) => Err(ParseError::unexpected_token(span.start, expected, token.to_string())),
            None => Err(ParseError::unexpected_eof(self.source.len(), expected)),
        }
    }

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

fn decode_entity(entity: &str, pos: usize) -> ParseResult<char> {
    let body = &entity[1..entity.len() - 1];
    let decoded = match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            if let Some(hex) = body.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(decimal) = body.strip_prefix('#') {
                decimal.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                None
            }
        }
    };

    decoded.ok_or_else(|| ParseError::UnknownEntity {
        pos,
        entity: entity.to_string(),
    })
}

/// Decode entities inside an attribute value starting at byte `offset`
fn unescape(raw: &str, offset: usize) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut consumed = 0;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let pos = offset + consumed + amp;
        let Some(semi) = rest[amp..].find(';') else {
            return Err(ParseError::UnknownEntity {
                pos,
                entity: rest[amp..].chars().take(8).collect(),
            });
        };

        let entity = &rest[amp..amp + semi + 1];
        out.push(decode_entity(entity, pos)?);

        consumed += amp + semi + 1;
        rest = &rest[amp + semi + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse markup into the generic element tree
pub fn parse_markup(source: &str) -> ParseResult<Element> {
    Parser::new(source)?.parse_document()
}

/// Parse markup and convert it into a validated document tree
pub fn deserialize(source: &str, registry: &SchemaRegistry) -> ParseResult<Node> {
    let root = parse_markup(source)?;
    let mut converter = Converter {
        registry,
        source,
        diagram_tags: HashMap::new(),
    };
    converter.convert_root(&root)
}

struct Converter<'a> {
    registry: &'a SchemaRegistry,
    source: &'a str,
    /// Start tag of the latest element carrying each diagram id
    diagram_tags: HashMap<String, Range<usize>>,
}

impl<'a> Converter<'a> {
    fn convert_root(&mut self, root: &Element) -> ParseResult<Node> {
        let top = self.registry.top_node();
        if root.name != top {
            return Err(self.invalid(root, format!("document root must be <{}>", top)));
        }

        let node = self.convert_node(root)?;

        // Whole-document rules such as diagram id uniqueness
        self.registry
            .validate_document(&node)
            .map_err(|error| self.document_error(root, error))?;

        Ok(node)
    }

    fn convert_node(&mut self, element: &Element) -> ParseResult<Node> {
        if element.name == TEXT_NODE || element.name == UNKNOWN_NODE {
            return Err(self.invalid(element, format!("<{}> is reserved", element.name)));
        }

        let registry = self.registry;
        let Some(spec) = registry.node_spec(&element.name) else {
            return Ok(self.unknown(element));
        };

        let attrs = self.convert_attrs(element, &spec.attrs)?;
        let attrs = registry
            .resolve_node_attrs(&element.name, attrs)
            .map_err(|error| self.invalid(element, error.to_string()))?;

        let node = match spec.content {
            NodeContent::Atomic | NodeContent::Text => {
                if let Some(child) = element.children.iter().find(|c| !is_blank(c)) {
                    return Err(self.invalid_child(element, child, "atomic nodes have no content"));
                }
                Node::atom(element.name.as_str(), attrs)
            }
            NodeContent::Blocks => {
                let mut node = Node::container(element.name.as_str(), self.convert_blocks(element)?);
                node.attrs = attrs;
                node
            }
            NodeContent::Inline => {
                let mut children = Vec::new();
                self.convert_inline(element, &element.children, &mut Vec::new(), &mut children)?;
                let mut node = Node::container(element.name.as_str(), merge_text_runs(children));
                node.attrs = attrs;
                node
            }
        };

        if spec.carries_diagram {
            self.record_diagram(element, &node.attrs);
        }

        Ok(node)
    }

    fn convert_blocks(&mut self, parent: &Element) -> ParseResult<Vec<Node>> {
        let mut nodes = Vec::new();

        for child in &parent.children {
            match child {
                // Whitespace between blocks is layout only
                Markup::Text { text, .. } if text.trim().is_empty() => {}
                Markup::Text { .. } => {
                    return Err(self.invalid_child(parent, child, "text must be inside a paragraph or heading"));
                }
                Markup::Element(element) => {
                    if self.registry.has_mark_type(&element.name) {
                        return Err(self.invalid(
                            element,
                            format!("mark <{}> outside inline content", element.name),
                        ));
                    }
                    let node = self.convert_node(element)?;
                    self.check_placement(parent, element, &node)?;
                    nodes.push(node);
                }
            }
        }

        Ok(nodes)
    }

    fn convert_inline(
        &mut self,
        parent: &Element,
        children: &[Markup],
        marks: &mut Vec<Mark>,
        out: &mut Vec<Node>,
    ) -> ParseResult<()> {
        let registry = self.registry;

        for child in children {
            match child {
                Markup::Text { text, span } => {
                    if text.is_empty() {
                        continue;
                    }
                    let mut run_marks = marks.clone();
                    self.registry.sort_marks(&mut run_marks);
                    let run = Node::marked_text(text.as_str(), run_marks);
                    if !self.registry.can_contain(&parent.name, TEXT_NODE) {
                        return Err(ParseError::invalid_content(
                            span.start,
                            &self.source[span.clone()],
                            format!("text is not allowed inside <{}>", parent.name),
                        ));
                    }
                    out.push(run);
                }
                Markup::Element(element) => {
                    if let Some(mark_spec) = registry.mark_spec(&element.name) {
                        let attrs = self.convert_attrs(element, &mark_spec.attrs)?;
                        let mark = self
                            .registry
                            .create_mark(&element.name, attrs)
                            .map_err(|error| self.invalid(element, error.to_string()))?;
                        if mark_spec.carries_diagram {
                            self.record_diagram(element, &mark.attrs);
                        }

                        marks.push(mark);
                        self.registry
                            .validate_marks(marks)
                            .map_err(|error| self.invalid(element, error.to_string()))?;
                        self.convert_inline(parent, &element.children, marks, out)?;
                        marks.pop();
                        continue;
                    }

                    let mut node = self.convert_node(element)?;
                    if node.node_type == UNKNOWN_NODE {
                        node.marks = marks.clone();
                        self.registry.sort_marks(&mut node.marks);
                    } else if !marks.is_empty() {
                        return Err(self.invalid(element, "only text runs can carry marks"));
                    }
                    self.check_placement(parent, element, &node)?;
                    out.push(node);
                }
            }
        }

        Ok(())
    }

    fn convert_attrs(&self, element: &Element, specs: &BTreeMap<String, AttrSpec>) -> ParseResult<Attrs> {
        let mut attrs = Attrs::new();

        for attr in &element.attrs {
            let spec = specs.get(&attr.name).ok_or_else(|| {
                ParseError::invalid_content(
                    attr.span.start,
                    self.fragment(element),
                    format!("<{}> has no attribute '{}'", element.name, attr.name),
                )
            })?;

            let value = spec.ty.parse(&attr.value).map_err(|reason| {
                ParseError::invalid_content(
                    attr.span.start,
                    self.fragment(element),
                    format!("invalid '{}': {}", attr.name, reason),
                )
            })?;
            attrs.insert(attr.name.clone(), value);
        }

        Ok(attrs)
    }

    fn check_placement(&self, parent: &Element, element: &Element, node: &Node) -> ParseResult<()> {
        if self.registry.can_contain(&parent.name, &node.node_type) {
            return Ok(());
        }
        Err(self.invalid(
            element,
            format!("<{}> is not allowed inside <{}>", element.name, parent.name),
        ))
    }

    fn unknown(&self, element: &Element) -> Node {
        let mut attrs = Attrs::new();
        attrs.insert(UNKNOWN_TAG_ATTR.to_string(), AttrValue::text(element.name.as_str()));
        attrs.insert(
            UNKNOWN_RAW_ATTR.to_string(),
            AttrValue::text(&self.source[element.span.clone()]),
        );
        Node::atom(UNKNOWN_NODE, attrs)
    }

    fn record_diagram(&mut self, element: &Element, attrs: &Attrs) {
        if let Some(id) = attrs.get(sketchbook_schema::diagram::ID_ATTR).and_then(AttrValue::as_text) {
            self.diagram_tags.insert(id.to_string(), element.open_tag.clone());
        }
    }

    fn document_error(&self, root: &Element, error: ValidationError) -> ParseError {
        if let ValidationError::DuplicateDiagramId(id) = &error {
            if let Some(tag) = self.diagram_tags.get(id) {
                return ParseError::invalid_content(tag.start, &self.source[tag.clone()], error.to_string());
            }
        }
        self.invalid(root, error.to_string())
    }

    fn fragment(&self, element: &Element) -> &'a str {
        &self.source[element.open_tag.clone()]
    }

    fn invalid(&self, element: &Element, reason: impl Into<String>) -> ParseError {
        ParseError::invalid_content(element.span.start, self.fragment(element), reason)
    }

    fn invalid_child(&self, parent: &Element, child: &Markup, reason: &str) -> ParseError {
        match child {
            Markup::Element(element) => self.invalid(element, reason),
            Markup::Text { span, .. } => ParseError::invalid_content(
                span.start,
                &self.source[span.clone()],
                format!("{} (in <{}>)", reason, parent.name),
            ),
        }
    }
}

fn is_blank(markup: &Markup) -> bool {
    matches!(markup, Markup::Text { text, .. } if text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_element_tree() {
        let root = parse_markup(r#"<doc><paragraph>a &lt; b</paragraph><rule/></doc>"#).unwrap();
        assert_eq!(root.name, "doc");
        assert_eq!(root.children.len(), 2);

        match &root.children[0] {
            Markup::Element(p) => match &p.children[0] {
                Markup::Text { text, .. } => assert_eq!(text, "a < b"),
                other => panic!("expected text, got {:?}", other),
            },
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_entities_decoded() {
        let root = parse_markup(r#"<diagram source="A-&gt;B &amp; C&#33;"/>"#).unwrap();
        assert_eq!(root.attrs[0].value, "A->B & C!");
    }

    #[test]
    fn test_mismatched_close_tag() {
        let error = parse_markup("<doc><paragraph>x</doc>").unwrap_err();
        assert!(matches!(error, ParseError::MismatchedTag { pos: 19, .. }));
    }

    #[test]
    fn test_missing_close_tag() {
        let error = parse_markup("<doc><paragraph>x").unwrap_err();
        assert!(matches!(error, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_duplicate_attribute() {
        let error = parse_markup(r#"<heading level="1" level="2"/>"#).unwrap_err();
        assert!(matches!(error, ParseError::InvalidContent { .. }));
    }

    #[test]
    fn test_trailing_content_rejected() {
        let error = parse_markup("<doc></doc><doc></doc>").unwrap_err();
        assert!(matches!(error, ParseError::UnexpectedToken { pos: 11, .. }));
    }

    #[test]
    fn test_unknown_entity() {
        let error = parse_markup("<doc>&nbsp;</doc>").unwrap_err();
        assert!(matches!(error, ParseError::UnknownEntity { pos: 5, .. }));
    }

    #[test]
    fn test_unescape_reports_offset() {
        let error = unescape("ab&zz;", 10).unwrap_err();
        assert_eq!(error.pos(), 12);
    }
}
