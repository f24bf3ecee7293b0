use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::{self, WavError};

/// What to say and with which voice. Built once per play action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
}

impl SpeechRequest {
    /// Blank text is refused before any network traffic; anything else is sent
    /// exactly as given, surrounding whitespace included.
    pub fn new(text: &str, voice_id: &str) -> Result<Self, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        Ok(Self {
            text: text.to_string(),
            voice_id: voice_id.to_string(),
        })
    }
}

/// Inline audio returned by the speech service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResponse {
    pub audio_bytes: Vec<u8>,
    pub mime_type: String,
    pub sample_rate: u32,
}

impl SpeechResponse {
    /// Build a response from raw bytes and a MIME type such as `audio/L16;rate=24000`.
    pub fn from_inline(audio_bytes: Vec<u8>, mime_type: &str) -> Result<Self, SpeechError> {
        let sample_rate = parse_l16_rate(mime_type).ok_or_else(|| {
            SpeechError::MalformedAudioResponse(format!(
                "unexpected audio MIME type '{}'",
                mime_type
            ))
        })?;

        Ok(Self {
            audio_bytes,
            mime_type: mime_type.to_string(),
            sample_rate,
        })
    }

    pub fn pcm_samples(&self) -> Result<Vec<i16>, WavError> {
        audio::pcm_samples_from_bytes(&self.audio_bytes)
    }

    pub fn to_wav(&self) -> Result<Vec<u8>, WavError> {
        audio::encode_pcm_bytes(&self.audio_bytes, self.sample_rate)
    }
}

/// Extract the sample rate from an `audio/L16;...;rate=N` MIME type.
pub fn parse_l16_rate(mime_type: &str) -> Option<u32> {
    let mut parts = mime_type.split(';').map(str::trim);
    let essence = parts.next()?;
    if !essence.eq_ignore_ascii_case("audio/L16") {
        return None;
    }

    parts
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse::<u32>().ok())
        .filter(|rate| *rate > 0)
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("nothing to speak: text is empty")]
    EmptyText,

    #[error("network failure talking to speech service: {0}")]
    NetworkFailure(String),

    #[error("speech service returned HTTP {status}: {body}")]
    ServiceFailure { status: u16, body: String },

    #[error("speech unavailable after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("malformed audio response: {0}")]
    MalformedAudioResponse(String),
}

impl SpeechError {
    /// Network and HTTP-status failures may clear up on their own; nothing else will.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SpeechError::NetworkFailure(_) | SpeechError::ServiceFailure { .. }
        )
    }
}

/// Speech synthesis backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Fetch audio for the request, retrying transient failures internally.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, SpeechError>;

    /// Voice used when the caller does not pick one.
    fn default_voice(&self) -> &str;
}
