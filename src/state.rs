use std::sync::Arc;
use uuid::Uuid;

use crate::config_manager::Config;
use crate::playback::ClipStore;
use crate::pronunciation::PronunciationService;
use crate::tts::{SpeechFactory, SpeechSynthesizer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub clips: Arc<ClipStore>,
    pub pronunciation: Option<Arc<PronunciationService>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let synthesizer = SpeechFactory::create_synthesizer(&config.speech_config)?;
        Ok(Self::with_synthesizer(config, synthesizer))
    }

    /// Build state around an explicit synthesizer (or none, to disable playback).
    pub fn with_synthesizer(
        config: Config,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        let system_config = &config.system_config;
        let clips = Arc::new(ClipStore::new(
            system_config.clip_ttl(),
            &system_config.public_audio_prefix,
        ));
        let pronunciation = synthesizer
            .map(|synthesizer| Arc::new(PronunciationService::new(synthesizer, clips.clone())));

        Self {
            config,
            clips,
            pronunciation,
        }
    }

    pub fn generate_client_uid(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
