//! # Sketchbook Schema
//!
//! Document model and schema registry for sketchbook sections.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: node/mark types + validation        │
//! │  - Attribute types and defaults             │
//! │  - Document tree (nodes, marks, positions)  │
//! │  - Diagram payloads and source hashing      │
//! └─────────────────────────────────────────────┘
//!            ↓                      ↓
//! ┌──────────────────────┐ ┌────────────────────┐
//! │ markup: text ↔ tree  │ │ editor: commands   │
//! └──────────────────────┘ └────────────────────┘
//! ```
//!
//! Every tree the markup layer loads and every tree a command produces is
//! validated by the same [`SchemaRegistry`].

pub mod attrs;
pub mod diagram;
pub mod error;
pub mod id_generator;
pub mod model;
pub mod registry;
pub mod rich_text;

pub use attrs::{AttrSpec, AttrType, AttrValue, Attrs, Length, LengthParseError, LengthUnit};
pub use diagram::{source_hash, DiagramId, DiagramKind, DiagramSource, SourceHash, ID_ATTR, KIND_ATTR, SOURCE_ATTR};
pub use error::{SchemaError, ValidationError};
pub use id_generator::{section_seed, IdGenerator};
pub use model::{merge_text_runs, Mark, Node, TEXT_NODE, UNKNOWN_NODE};
pub use registry::{MarkSpec, NodeContent, NodeGroup, NodeSpec, SchemaRegistry};
