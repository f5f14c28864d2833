use sketchbook_schema::rich_text::{DIAGRAM, DOC, FONT_SIZE, PARAGRAPH, SIZE_ATTR};
use sketchbook_schema::*;

#[test]
fn test_extend_rich_text_with_custom_block() {
    let mut registry = SchemaRegistry::rich_text();
    registry
        .register_node_type(
            "callout",
            NodeSpec::blocks().attr(
                "tone",
                AttrSpec::with_default(AttrType::one_of(&["info", "warning"]), "info"),
            ),
        )
        .unwrap();

    let callout = registry
        .create_container(
            "callout",
            Attrs::new(),
            vec![Node::container(PARAGRAPH, vec![Node::text("Heads up")])],
        )
        .unwrap();
    assert_eq!(callout.attr("tone"), Some(&AttrValue::text("info")));

    let doc = Node::container(DOC, vec![callout]);
    assert_eq!(registry.validate_document(&doc), Ok(()));
}

#[test]
fn test_font_size_requires_supported_unit() {
    let registry = SchemaRegistry::rich_text();
    let spec = registry.mark_spec(FONT_SIZE).unwrap();
    let size = &spec.attrs[SIZE_ATTR];

    assert_eq!(size.ty.parse("18pt"), Ok(AttrValue::Length(Length::pt(18.0))));
    assert!(size.ty.parse("18").is_err());
    assert!(size.ty.parse("-2em").is_err());
}

#[test]
fn test_unknown_node_fits_anywhere() {
    let registry = SchemaRegistry::rich_text();
    let unknown = Node::atom(UNKNOWN_NODE, Attrs::new())
        .with_attr("tag", "mindmap")
        .with_attr("raw", "<mindmap/>");

    let doc = Node::container(
        DOC,
        vec![
            unknown.clone(),
            Node::container(PARAGRAPH, vec![Node::text("a"), unknown]),
        ],
    );
    assert_eq!(registry.validate_document(&doc), Ok(()));
}

#[test]
fn test_root_must_be_top_node() {
    let registry = SchemaRegistry::rich_text();
    let para = Node::container(PARAGRAPH, vec![]);
    assert_eq!(
        registry.validate_document(&para),
        Err(ValidationError::InvalidRoot {
            expected: DOC.to_string(),
            found: PARAGRAPH.to_string(),
        })
    );
}

#[test]
fn test_node_json_shape() {
    let diagram = Node::atom(
        DIAGRAM,
        DiagramSource::new("d1", DiagramKind::Flowchart, "A->B").to_attrs(),
    );
    let json = serde_json::to_value(&diagram).unwrap();

    assert_eq!(json["node_type"], "diagram");
    assert_eq!(json["attrs"]["id"]["value"], "d1");
    assert!(json.get("children").is_none());

    let back: Node = serde_json::from_value(json).unwrap();
    assert_eq!(back, diagram);
}

#[test]
fn test_diagram_attrs_use_crate_root_names() {
    let attrs = DiagramSource::new("d1", DiagramKind::Flowchart, "A->B").to_attrs();
    assert_eq!(attrs.get(ID_ATTR).and_then(AttrValue::as_text), Some("d1"));
    assert_eq!(attrs.get(KIND_ATTR).and_then(AttrValue::as_text), Some("flowchart"));
    assert_eq!(attrs.get(SOURCE_ATTR).and_then(AttrValue::as_text), Some("A->B"));
}
