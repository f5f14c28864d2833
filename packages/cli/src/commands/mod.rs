pub mod apply;
pub mod check;
pub mod diagrams;
pub mod edit;
pub mod fmt;
pub mod render;

pub use apply::{apply, ApplyArgs};
pub use check::{check, CheckArgs};
pub use diagrams::{diagrams, DiagramsArgs};
pub use edit::{edit_diagram, EditDiagramArgs};
pub use fmt::{fmt, FmtArgs};
pub use render::{render, RenderArgs};

use anyhow::{anyhow, Result};
use sketchbook_editor::{deserialize, DocumentState, SchemaRegistry};
use sketchbook_markup::format_error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolve a path argument against the working directory
pub(crate) fn resolve(cwd: &str, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        PathBuf::from(cwd).join(path)
    }
}

/// Read markup from disk
pub(crate) fn read_markup(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))
}

/// Deserialize markup against the rich text schema, with a pretty error on failure
pub(crate) fn load_document(markup: &str, path: &Path) -> Result<DocumentState> {
    let registry = Arc::new(SchemaRegistry::rich_text());
    deserialize(markup, registry).map_err(|e| {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
        anyhow!("\n{}", format_error(markup, file_name, &e))
    })
}
