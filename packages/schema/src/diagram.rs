//! # Diagram Sources
//!
//! The attribute payload carried by diagram blocks and inline diagram marks.
//!
//! A diagram is identified by a stable [`DiagramId`]: editing its source text
//! keeps the id, inserting a new diagram mints a new one. The [`SourceHash`] of
//! the text is what the render layer uses to detect changes.

use crate::attrs::{AttrValue, Attrs};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ID_ATTR: &str = "id";
pub const KIND_ATTR: &str = "kind";
pub const SOURCE_ATTR: &str = "source";

/// Stable identity of one diagram within a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiagramId(String);

impl DiagramId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DiagramId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DiagramId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which external renderer a diagram source is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramKind {
    /// Text flowchart script (`A->B`)
    Flowchart,
    /// XML payload produced by the external vector-diagram editor
    ExternalXml,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 2] = [DiagramKind::Flowchart, DiagramKind::ExternalXml];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::Flowchart => "flowchart",
            DiagramKind::ExternalXml => "external_xml",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown diagram kind '{0}'")]
pub struct UnknownDiagramKind(pub String);

impl FromStr for DiagramKind {
    type Err = UnknownDiagramKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownDiagramKind(s.to_string()))
    }
}

/// Content hash of a diagram's source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceHash(u32);

impl SourceHash {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SourceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Hash diagram source text using CRC32
pub fn source_hash(text: &str) -> SourceHash {
    let mut hasher = Hasher::new();
    hasher.update(text.as_bytes());
    SourceHash(hasher.finalize())
}

/// Diagram payload: identity, renderer kind and source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramSource {
    pub id: DiagramId,
    pub kind: DiagramKind,
    pub source: String,
}

impl DiagramSource {
    pub fn new(id: impl Into<DiagramId>, kind: DiagramKind, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
        }
    }

    /// Read the payload out of a node's or mark's attributes
    pub fn from_attrs(attrs: &Attrs) -> Option<Self> {
        let id = attrs.get(ID_ATTR)?.as_text()?;
        let kind = attrs.get(KIND_ATTR)?.as_text()?.parse().ok()?;
        let source = attrs.get(SOURCE_ATTR)?.as_text()?;

        Some(Self::new(id, kind, source))
    }

    pub fn to_attrs(&self) -> Attrs {
        let mut attrs = Attrs::new();
        attrs.insert(ID_ATTR.to_string(), AttrValue::text(self.id.as_str()));
        attrs.insert(KIND_ATTR.to_string(), AttrValue::text(self.kind.as_str()));
        attrs.insert(SOURCE_ATTR.to_string(), AttrValue::text(self.source.clone()));
        attrs
    }

    pub fn hash(&self) -> SourceHash {
        source_hash(&self.source)
    }
}
