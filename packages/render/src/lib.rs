//! # Sketchbook Render
//!
//! Decorations, the render scheduler and the diagram renderers.
//!
//! ## Architecture
//!
//! ```text
//! document tree ──▶ decorations() ──▶ [WidgetPlaceholder]
//!                                           │
//!                                           ▼
//!                                  RenderScheduler::update
//!                                   │        │        │
//!                               cache hit  adopt   spawn render ──▶ DiagramRenderer
//!                                   │        │        │
//!                                   ▼        ▼        ▼
//!                                WidgetSlot::patch ◀── completion (generation checked)
//! ```
//!
//! Nothing in this crate writes to the document. Rendered output only ever
//! reaches host widget slots.

pub mod cache;
pub mod config;
pub mod decorations;
pub mod error;
pub mod flowchart;
pub mod renderer;
pub mod scheduler;
pub mod slot;

pub use cache::{CacheEntry, RenderCache};
pub use config::{CommandSpec, RenderConfig, RendererCommands};
pub use decorations::{decorations, WidgetPlaceholder};
pub use error::RenderError;
pub use flowchart::{parse_flowchart, FlowchartTextRenderer};
pub use renderer::{
    CommandEditor, CommandRenderer, DiagramEditor, DiagramRenderer, EditFuture, RenderFuture,
    RenderedOutput, RendererSet, XmlPassthroughRenderer,
};
pub use scheduler::{CompletionOutcome, RenderScheduler, WidgetState};
pub use slot::{WidgetContent, WidgetSlot};
