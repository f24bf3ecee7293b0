use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// System configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory with the collector front end, served at `/` when set.
    #[serde(rename = "static_dir")]
    #[serde(default)]
    pub static_dir: Option<String>,

    /// Unreleased clips older than this are dropped by the sweeper.
    #[serde(rename = "clip_ttl_secs")]
    #[serde(default = "default_clip_ttl_secs")]
    pub clip_ttl_secs: u64,

    #[serde(rename = "clip_sweep_interval_secs")]
    #[serde(default = "default_clip_sweep_interval_secs")]
    pub clip_sweep_interval_secs: u64,

    /// URL prefix under which published clips are reachable.
    #[serde(rename = "public_audio_prefix")]
    #[serde(default = "default_public_audio_prefix")]
    pub public_audio_prefix: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_clip_ttl_secs() -> u64 {
    300
}

fn default_clip_sweep_interval_secs() -> u64 {
    60
}

fn default_public_audio_prefix() -> String {
    "/api/audio".to_string()
}

impl SystemConfig {
    /// Socket address to bind; an unparsable host falls back to all interfaces.
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = match self.host.as_str() {
            "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
            host => host
                .parse::<IpAddr>()
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        };
        SocketAddr::new(ip, self.port)
    }

    pub fn static_path(&self) -> Option<PathBuf> {
        self.static_dir.as_ref().map(PathBuf::from)
    }

    pub fn clip_ttl(&self) -> Duration {
        Duration::from_secs(self.clip_ttl_secs)
    }

    pub fn clip_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.clip_sweep_interval_secs.max(1))
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            clip_ttl_secs: default_clip_ttl_secs(),
            clip_sweep_interval_secs: default_clip_sweep_interval_secs(),
            public_audio_prefix: default_public_audio_prefix(),
        }
    }
}
