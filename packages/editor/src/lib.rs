//! # Sketchbook Editor
//!
//! Document store and command layer for rich-text sections with embedded
//! diagrams.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markup: section text ⇄ document tree        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: DocumentState + commands            │
//! │  - Pure, validated commands                 │
//! │  - Linear undo/redo history                 │
//! │  - Selection and diagram id minting         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ render: decorations → scheduler → slots     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is the source of truth**: rendered diagrams are derived views
//! 2. **States are immutable**: every command yields a new `DocumentState`
//! 3. **Failed commands are no-ops**: errors never leave a half-applied edit
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sketchbook_editor::{Command, EditSession, Selection};
//!
//! let mut session = EditSession::open("section-1", &markup, registry)?;
//! session.set_selection(Selection::new(1, 12));
//! session.apply(&Command::SetFontSize { size: Length::pt(18.0) })?;
//!
//! let markup = session.serialize();
//! ```

mod commands;
mod config;
mod document;
mod errors;
mod history;
mod pipeline;
mod selection;
mod session;

pub use commands::{apply_command, Command};
pub use config::HistoryConfig;
pub use document::{deserialize, serialize, DocumentState};
pub use errors::{CommandError, EditorError};
pub use history::{History, HistoryEntry, Snapshot};
pub use pipeline::{Pipeline, PipelineResult};
pub use selection::Selection;
pub use session::EditSession;

// Re-export common types for convenience
pub use sketchbook_render::{RenderConfig, WidgetContent, WidgetPlaceholder};
pub use sketchbook_schema::{DiagramId, DiagramKind, Length, SchemaRegistry};
