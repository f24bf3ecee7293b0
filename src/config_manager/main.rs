use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::config_manager::speech::SpeechConfig;
use crate::config_manager::system::SystemConfig;

/// Main configuration for the application, stored as JSON-LD or YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "@context")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    #[serde(rename = "system_config")]
    #[serde(default)]
    pub system_config: SystemConfig,

    #[serde(rename = "speech_config")]
    #[serde(default)]
    pub speech_config: SpeechConfig,
}

impl Config {
    /// Load configuration, picking the format from the file extension
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use crate::config_manager::utils::{read_jsonld, read_yaml, validate_config};

        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_lowercase().as_str(), "json" | "jsonld"))
            .unwrap_or(false);

        let value = if is_json {
            read_jsonld(path)?
        } else {
            read_yaml(path)?
        };
        validate_config(&value)
    }
}
