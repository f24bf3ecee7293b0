use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Configuration for the remote text-to-speech service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(rename = "base_url")]
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(rename = "api_key")]
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_voice")]
    pub voice: String,

    /// Prompt sent to the service; `{text}` is replaced by the character.
    #[serde(rename = "prompt_template")]
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,

    #[serde(rename = "request_timeout_secs")]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_prompt_template() -> String {
    "Say clearly: {text}".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl SpeechConfig {
    /// An empty key, or a `${VAR}` placeholder nobody filled in, disables speech.
    pub fn has_api_key(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && !key.starts_with("${")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Fill `{text}` in a prompt template; a template without it sends the text alone.
pub fn render_prompt(template: &str, text: &str) -> String {
    if template.contains("{text}") {
        template.replace("{text}", text)
    } else {
        text.to_string()
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: String::new(),
            voice: default_voice(),
            prompt_template: default_prompt_template(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_placeholder_counts_as_missing_key() {
        let mut config = SpeechConfig::default();
        assert!(!config.has_api_key());

        config.api_key = "${GEMINI_API_KEY}".to_string();
        assert!(!config.has_api_key());

        config.api_key = "secret".to_string();
        assert!(config.has_api_key());
    }

    #[test]
    fn prompt_substitutes_text() {
        let config = SpeechConfig::default();
        assert_eq!(render_prompt(&config.prompt_template, "క"), "Say clearly: క");
        assert_eq!(render_prompt("", "క"), "క");
    }
}
