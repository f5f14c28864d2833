//! Error types for the markup reader

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Longest fragment quoted in an error message
const MAX_FRAGMENT_LEN: usize = 60;

/// Load failure. Every variant names the byte offset of the offending input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected character at {pos}: `{fragment}`")]
    LexerError { pos: usize, fragment: String },

    #[error("Unexpected end of input at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Mismatched closing tag at {pos}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unknown entity `{entity}` at {pos}")]
    UnknownEntity { pos: usize, entity: String },

    #[error("Invalid content at {pos} in `{fragment}`: {reason}")]
    InvalidContent {
        pos: usize,
        fragment: String,
        reason: String,
    },
}

impl ParseError {
    pub fn lexer_error(pos: usize, fragment: &str) -> Self {
        Self::LexerError {
            pos,
            fragment: shorten(fragment),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid_content(pos: usize, fragment: &str, reason: impl Into<String>) -> Self {
        Self::InvalidContent {
            pos,
            fragment: shorten(fragment),
            reason: reason.into(),
        }
    }

    /// Byte offset of the offending input
    pub fn pos(&self) -> usize {
        match self {
            ParseError::LexerError { pos, .. }
            | ParseError::UnexpectedEof { pos, .. }
            | ParseError::UnexpectedToken { pos, .. }
            | ParseError::MismatchedTag { pos, .. }
            | ParseError::UnknownEntity { pos, .. }
            | ParseError::InvalidContent { pos, .. } => *pos,
        }
    }

    fn label(&self) -> String {
        match self {
            ParseError::LexerError { .. } => "not valid markup".to_string(),
            ParseError::UnexpectedEof { expected, .. } | ParseError::UnexpectedToken { expected, .. } => {
                format!("expected {}", expected)
            }
            ParseError::MismatchedTag { expected, .. } => format!("expected </{}>", expected),
            ParseError::UnknownEntity { .. } => "unknown entity".to_string(),
            ParseError::InvalidContent { reason, .. } => reason.clone(),
        }
    }
}

/// Collapse whitespace and cut long fragments so messages stay on one line
fn shorten(fragment: &str) -> String {
    let collapsed: String = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_FRAGMENT_LEN {
        collapsed
    } else {
        let cut: String = collapsed.chars().take(MAX_FRAGMENT_LEN).collect();
        format!("{}...", cut)
    }
}

/// Pretty-print an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let start = error.pos().min(source.len());
    let end = source[start..]
        .char_indices()
        .nth(1)
        .map(|(offset, _)| start + offset)
        .unwrap_or(source.len());

    let mut output = Vec::new();
    let report = Report::build(ReportKind::Error, filename, start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(error.label()),
        )
        .finish();

    if report.write((filename, Source::from(source)), &mut output).is_err() {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}

/// Plain rendition used when the `pretty-errors` feature is off
#[cfg(not(feature = "pretty-errors"))]
pub fn format_error(_source: &str, filename: &str, error: &ParseError) -> String {
    format!("{}: {} ({})", filename, error, error.label())
}
