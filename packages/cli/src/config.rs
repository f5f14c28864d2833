use serde::{Deserialize, Serialize};
use sketchbook_editor::HistoryConfig;
use sketchbook_render::RenderConfig;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "sketchbook.config.json";

/// Sketchbook configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Undo history settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Render scheduler settings and external renderer commands
    #[serde(default)]
    pub render: RenderConfig,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid {}: {}", DEFAULT_CONFIG_NAME, e))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchbook_render::CommandSpec;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "history": { "maxLevels": 20 },
            "render": {
                "timeoutMs": 2500,
                "commands": {
                    "flowchart": { "program": "mmdc", "args": ["-i", "-"] },
                    "xmlEditor": { "program": "drawio" }
                }
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.history.max_levels, 20);
        assert_eq!(config.render.timeout_ms, 2500);
        assert_eq!(config.render.cache_capacity, RenderConfig::default().cache_capacity);
        assert_eq!(
            config.render.commands.flowchart,
            Some(CommandSpec {
                program: "mmdc".to_string(),
                args: vec!["-i".to_string(), "-".to_string()],
            })
        );
        assert_eq!(config.render.commands.xml_editor.unwrap().args.len(), 0);
    }

    #[test]
    fn test_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.history.max_levels, 100);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "render": { "cacheCapacity": 8 } }"#,
        )
        .unwrap();

        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.render.cache_capacity, 8);
        assert_eq!(config.history, HistoryConfig::default());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ nope").unwrap();

        let error = Config::load(dir.path().to_str().unwrap()).unwrap_err();
        assert!(error.to_string().contains(DEFAULT_CONFIG_NAME));
    }
}
