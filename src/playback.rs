use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// A published WAV buffer waiting to be played.
#[derive(Debug, Clone)]
pub struct Clip {
    pub wav: Bytes,
    pub created_at: DateTime<Utc>,
}

/// Where the browser can fetch a published clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipHandle {
    #[serde(rename = "clip_id")]
    pub id: Uuid,
    #[serde(rename = "audio_url")]
    pub url: String,
}

/// Short-lived store backing the playable audio URLs.
///
/// A clip stays reachable until the front end releases it after playback or
/// it outlives the TTL and the sweeper drops it.
pub struct ClipStore {
    clips: DashMap<Uuid, Clip>,
    ttl: chrono::Duration,
    public_prefix: String,
}

impl ClipStore {
    pub fn new(ttl: Duration, public_prefix: &str) -> Self {
        Self {
            clips: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365)),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn publish(&self, wav: Vec<u8>) -> ClipHandle {
        self.publish_at(wav, Utc::now())
    }

    fn publish_at(&self, wav: Vec<u8>, now: DateTime<Utc>) -> ClipHandle {
        let id = Uuid::new_v4();
        let size = wav.len();
        self.clips.insert(
            id,
            Clip {
                wav: Bytes::from(wav),
                created_at: now,
            },
        );
        debug!("Published clip {} ({} bytes)", id, size);

        ClipHandle {
            id,
            url: format!("{}/{}", self.public_prefix, id),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Bytes> {
        self.clips.get(id).map(|clip| clip.wav.clone())
    }

    /// Revoke a clip's URL. Returns false if it was already gone.
    pub fn release(&self, id: &Uuid) -> bool {
        let released = self.clips.remove(id).is_some();
        if released {
            debug!("Released clip {}", id);
        }
        released
    }

    /// Drop every clip older than the TTL as of `now`; returns how many went.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.clips.len();
        self.clips
            .retain(|_, clip| now.signed_duration_since(clip.created_at) < self.ttl);
        before.saturating_sub(self.clips.len())
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Run [`ClipStore::sweep`] on a fixed interval until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = self.sweep(Utc::now());
                if removed > 0 {
                    info!("Expired {} unreleased audio clip(s)", removed);
                }
            }
        })
    }
}
