//! Pronunciation playback backend for the Telugu handwriting collector.
//!
//! The browser asks `/api/speak` for a character; the server fetches inline
//! PCM from the speech service (retrying transient failures with backoff),
//! wraps it in a WAV container and publishes it under `/api/audio/:id` until
//! the browser releases it after playback.

pub mod audio;
pub mod config_manager;
pub mod playback;
pub mod pronunciation;
pub mod retry;
pub mod routes;
pub mod state;
pub mod tts;
