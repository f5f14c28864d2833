//! Tests for sequences of commands through an edit session
//!
//! Covers:
//! - Undo/redo across formatting and typing
//! - Batched edits undone as one step
//! - Redo invalidation after a fresh edit
//! - History depth limits
//! - Selection restoration

use sketchbook_editor::*;
use sketchbook_schema::rich_text::{BOLD, ITALIC};
use std::sync::Arc;

const HELLO: &str = "<doc><paragraph>Hello World</paragraph></doc>";

fn open(markup: &str) -> EditSession {
    EditSession::open("section-1", markup, Arc::new(SchemaRegistry::rich_text())).unwrap()
}

fn toggle(mark_type: &str) -> Command {
    Command::ToggleMark {
        mark_type: mark_type.to_string(),
    }
}

#[test]
fn test_undo_redo_formatting_and_typing() -> anyhow::Result<()> {
    let mut session = open(HELLO);
    let original = session.serialize();

    // Bold "Hello", then type at the end
    session.set_selection(Selection::new(1, 6));
    session.apply(&toggle(BOLD))?;
    let bolded = session.serialize();

    session.set_selection(Selection::cursor(12));
    session.apply(&Command::InsertText { text: "!".to_string() })?;
    assert_eq!(session.state().text_content(), "Hello World!");
    assert_eq!(session.selection(), Selection::cursor(13));

    // Walk back to the start
    assert!(session.undo());
    assert_eq!(session.serialize(), bolded);
    assert!(session.undo());
    assert_eq!(session.serialize(), original);
    assert!(!session.undo());

    // And forward again
    assert!(session.redo());
    assert_eq!(session.serialize(), bolded);
    assert!(session.redo());
    assert_eq!(session.state().text_content(), "Hello World!");
    assert!(!session.redo());

    Ok(())
}

#[test]
fn test_undo_restores_selection() -> anyhow::Result<()> {
    let mut session = open(HELLO);
    session.set_selection(Selection::new(7, 12));
    session.apply(&Command::DeleteRange)?;
    assert_eq!(session.selection(), Selection::cursor(7));
    assert_eq!(session.state().text_content(), "Hello ");

    session.undo();
    assert_eq!(session.selection(), Selection::new(7, 12));
    assert_eq!(session.state().text_content(), "Hello World");

    Ok(())
}

#[test]
fn test_batch_undoes_as_one_step() -> anyhow::Result<()> {
    let mut session = open(HELLO);
    let original = session.serialize();

    session.begin_batch("emphasis");
    session.set_selection(Selection::new(1, 6));
    session.apply(&toggle(BOLD))?;
    session.apply(&toggle(ITALIC))?;
    session.set_selection(Selection::new(7, 12));
    session.apply(&Command::SetFontSize { size: Length::pt(18.0) })?;
    session.end_batch();

    assert_eq!(session.history().undo_levels(), 1);
    assert_eq!(session.history().undo_description(), Some("emphasis"));

    session.undo();
    assert_eq!(session.serialize(), original);
    assert_eq!(session.selection(), Selection::new(1, 6));

    session.redo();
    let runs = session.state().root().children()[0].children();
    assert!(runs[0].has_mark(BOLD) && runs[0].has_mark(ITALIC));

    Ok(())
}

#[test]
fn test_rejected_command_leaves_history_untouched() {
    let mut session = open(HELLO);
    session.set_selection(Selection::cursor(3));

    let result = session.apply(&toggle(BOLD));
    assert!(matches!(result, Err(EditorError::Command(CommandError::EmptySelection))));
    assert!(!session.history().can_undo());
    assert_eq!(session.state().version(), 0);
}

#[test]
fn test_new_edit_clears_redo() -> anyhow::Result<()> {
    let mut session = open(HELLO);
    session.set_selection(Selection::new(1, 6));
    session.apply(&toggle(BOLD))?;
    session.undo();
    assert!(session.history().can_redo());

    session.set_selection(Selection::new(7, 12));
    session.apply(&toggle(ITALIC))?;
    assert!(!session.history().can_redo());
    assert!(!session.redo());

    Ok(())
}

#[test]
fn test_history_depth_is_bounded() -> anyhow::Result<()> {
    let mut session = open(HELLO).with_history_config(&HistoryConfig { max_levels: 3 });

    session.set_selection(Selection::cursor(12));
    for c in ["a", "b", "c", "d", "e"] {
        session.apply(&Command::InsertText { text: c.to_string() })?;
    }
    assert_eq!(session.history().undo_levels(), 3);

    while session.undo() {}
    assert_eq!(session.state().text_content(), "Hello Worldab");

    Ok(())
}

#[test]
fn test_diagram_insert_edit_undo_sequence() -> anyhow::Result<()> {
    let mut session = open(HELLO);
    session.set_selection(Selection::cursor(13));
    let id = session.insert_diagram(DiagramKind::Flowchart, "A->B")?;

    session.apply(&Command::EditDiagramSource {
        id: id.clone(),
        source: "A->C".to_string(),
    })?;
    assert_eq!(session.state().find_diagram(&id).unwrap().source_text, "A->C");

    // Source edit undone, id unchanged
    session.undo();
    let diagram = session.state().find_diagram(&id).unwrap();
    assert_eq!(diagram.source_text, "A->B");

    // Insertion undone
    session.undo();
    assert!(!session.state().has_diagram(&id));

    // Both redone
    session.redo();
    session.redo();
    assert_eq!(session.state().find_diagram(&id).unwrap().source_text, "A->C");

    Ok(())
}

#[test]
fn test_minted_ids_are_unique() -> anyhow::Result<()> {
    let mut session = open(HELLO);
    session.set_selection(Selection::cursor(13));
    let first = session.insert_diagram(DiagramKind::Flowchart, "A->B")?;
    let second = session.insert_diagram(DiagramKind::ExternalXml, "<mxGraphModel/>")?;

    assert_ne!(first, second);
    assert_eq!(session.state().diagrams().len(), 2);

    Ok(())
}
