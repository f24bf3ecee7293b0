use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::audio::{self, WavError};
use crate::playback::{ClipHandle, ClipStore};
use crate::tts::{SpeechError, SpeechRequest, SpeechSynthesizer};

#[derive(Debug, Error)]
pub enum PlayError {
    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error("speech audio could not be encoded: {0}")]
    Audio(#[from] WavError),

    #[error("superseded by a newer request from the same client")]
    Superseded,

    #[error("speech task failed: {0}")]
    TaskFailed(String),
}

impl PlayError {
    /// Short text for the front end's notification toast.
    pub fn user_message(&self) -> String {
        match self {
            PlayError::Speech(SpeechError::EmptyText) => {
                "Please select a character first!".to_string()
            }
            PlayError::Speech(SpeechError::RetriesExhausted { attempts, .. }) => format!(
                "Pronunciation is unavailable right now (tried {} times).",
                attempts
            ),
            PlayError::Speech(_) | PlayError::Audio(_) => {
                "Could not play pronunciation: the speech service sent unusable audio."
                    .to_string()
            }
            PlayError::Superseded => "Playback replaced by a newer request.".to_string(),
            PlayError::TaskFailed(_) => "Could not play pronunciation.".to_string(),
        }
    }
}

/// A clip ready for the browser's audio element.
#[derive(Debug, Clone, Serialize)]
pub struct PlayedClip {
    #[serde(flatten)]
    pub clip: ClipHandle,
    pub sample_rate: u32,
    pub sample_count: usize,
    pub duration_ms: u64,
}

struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

/// Turns a character into a playable clip: fetch, decode, encode, publish.
///
/// Each client has at most one request in flight. A new `play` from the same
/// client aborts the older one, which then returns [`PlayError::Superseded`].
pub struct PronunciationService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    clips: Arc<ClipStore>,
    in_flight: DashMap<String, InFlight>,
    generation: AtomicU64,
}

/// Clears this call's registration on every exit path, including when the
/// caller drops the `play` future.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<String, InFlight>,
    client_id: &'a str,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some((_, entry)) = self
            .in_flight
            .remove_if(self.client_id, |_, entry| entry.generation == self.generation)
        {
            entry.abort.abort();
        }
    }
}

impl PronunciationService {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, clips: Arc<ClipStore>) -> Self {
        Self {
            synthesizer,
            clips,
            in_flight: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn clips(&self) -> &Arc<ClipStore> {
        &self.clips
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub async fn play(&self, client_id: &str, text: &str) -> Result<PlayedClip, PlayError> {
        let request = SpeechRequest::new(text, self.synthesizer.default_voice())?;

        let synthesizer = self.synthesizer.clone();
        let task = tokio::spawn(async move { synthesizer.synthesize(&request).await });

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let previous = self.in_flight.insert(
            client_id.to_string(),
            InFlight {
                generation,
                abort: task.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            debug!("Client {} re-triggered playback; cancelling older request", client_id);
            previous.abort.abort();
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            client_id,
            generation,
        };

        let response = match task.await {
            Ok(result) => result?,
            Err(join_err) if join_err.is_cancelled() => return Err(PlayError::Superseded),
            Err(join_err) => {
                error!("Speech task for client {} failed: {}", client_id, join_err);
                return Err(PlayError::TaskFailed(join_err.to_string()));
            }
        };

        let samples = response.pcm_samples()?;
        let wav = audio::encode_wav(&samples, response.sample_rate);
        let duration_ms = audio::duration_ms(samples.len(), response.sample_rate);
        let clip = self.clips.publish(wav);

        info!(
            "Pronunciation ready for {:?}: {} samples @ {} Hz -> {}",
            text,
            samples.len(),
            response.sample_rate,
            clip.url
        );

        Ok(PlayedClip {
            clip,
            sample_rate: response.sample_rate,
            sample_count: samples.len(),
            duration_ms,
        })
    }

    /// `play`, with failures logged the way the HTTP layer reports them.
    pub async fn play_logged(&self, client_id: &str, text: &str) -> Result<PlayedClip, PlayError> {
        let result = self.play(client_id, text).await;
        if let Err(err) = &result {
            match err {
                PlayError::Superseded => debug!("Playback for {} superseded", client_id),
                PlayError::Speech(SpeechError::EmptyText) => {
                    debug!("Ignoring empty playback request from {}", client_id)
                }
                other => warn!("Pronunciation playback failed for {}: {}", client_id, other),
            }
        }
        result
    }
}
