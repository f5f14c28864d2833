use serde::{Deserialize, Serialize};

const DEFAULT_MAX_LEVELS: usize = 100;

/// Undo history settings, read from the `history` section of `sketchbook.config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Maximum number of undo levels (0 = unlimited)
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
}

fn default_max_levels() -> usize {
    DEFAULT_MAX_LEVELS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
        }
    }
}
