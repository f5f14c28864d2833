use std::time::Duration;
use thiserror::Error;

/// Failure of a single widget's render. Never fatal: the scheduler turns it
/// into an inline error indicator for that widget.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Invalid diagram source on line {line}: {message}")]
    InvalidSource { line: usize, message: String },

    #[error("No renderer registered for '{0}' diagrams")]
    NoRenderer(String),

    #[error("Renderer failed: {0}")]
    Failed(String),

    #[error("External command '{program}' failed: {message}")]
    Command { program: String, message: String },

    #[error("Render timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Renderer panicked: {0}")]
    Panicked(String),
}

impl RenderError {
    pub fn invalid_source(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidSource {
            line,
            message: message.into(),
        }
    }

    /// Failures that say nothing about the source itself and are not cached
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RenderError::TimedOut(_) | RenderError::Panicked(_) | RenderError::Command { .. }
        )
    }
}
