//! Error types for the editor

use sketchbook_markup::ParseError;
use sketchbook_render::RenderError;
use sketchbook_schema::ValidationError;
use thiserror::Error;

/// Why a command was rejected. A rejected command leaves the document as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Selection contains no text")]
    EmptySelection,

    #[error("Nothing to insert")]
    EmptyText,

    #[error("Position {0} is not a valid place for this command")]
    InvalidPosition(usize),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("'{0}' is not a textblock type")]
    InvalidBlockType(String),

    #[error("Diagram id '{0}' already exists")]
    DuplicateDiagramId(String),

    #[error("Diagram '{0}' not found")]
    DiagramNotFound(String),

    #[error("Schema violation: {0}")]
    Validation(ValidationError),
}

impl From<ValidationError> for CommandError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::DuplicateDiagramId(id) => CommandError::DuplicateDiagramId(id),
            ValidationError::InvalidAttribute { name, reason, .. } => {
                CommandError::InvalidAttribute { name, reason }
            }
            other => CommandError::Validation(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Invalid document: {0}")]
    Validation(#[from] ValidationError),
}
