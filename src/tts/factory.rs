use std::sync::Arc;
use anyhow::Result;
use tracing::{info, warn};
use crate::config_manager::SpeechConfig;
use super::client::GeminiSpeechClient;
use super::interface::SpeechSynthesizer;

/// Factory for creating speech synthesizers
pub struct SpeechFactory;

impl SpeechFactory {
    /// Create a synthesizer based on configuration
    ///
    /// Returns `Ok(None)` when no API key is configured: the collector still
    /// works, it just cannot play pronunciations.
    pub fn create_synthesizer(config: &SpeechConfig) -> Result<Option<Arc<dyn SpeechSynthesizer>>> {
        if !config.has_api_key() {
            warn!("No speech API key configured; pronunciation playback is disabled");
            return Ok(None);
        }

        info!("Initializing speech synthesizer: {} @ {}", config.model, config.base_url);
        let client = GeminiSpeechClient::new(config)?;
        Ok(Some(Arc::new(client)))
    }
}
