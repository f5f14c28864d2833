//! Render scheduler configuration, read from the `render` section of
//! `sketchbook.config.json`.

use serde::{Deserialize, Serialize};
use sketchbook_schema::DiagramKind;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Upper bound on a single render call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of cached render results
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// External commands replacing the built-in renderers
    #[serde(default)]
    pub commands: RendererCommands,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererCommands {
    pub flowchart: Option<CommandSpec>,
    pub external_xml: Option<CommandSpec>,
    /// Interactive editor for external XML diagrams
    pub xml_editor: Option<CommandSpec>,
}

impl RendererCommands {
    pub fn for_kind(&self, kind: DiagramKind) -> Option<&CommandSpec> {
        match kind {
            DiagramKind::Flowchart => self.flowchart.as_ref(),
            DiagramKind::ExternalXml => self.external_xml.as_ref(),
        }
    }
}

/// Program reading diagram source on stdin and writing output on stdout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            commands: RendererCommands::default(),
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
