// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Session configuration via `renderstream.toml`.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{RenderStreamError, Result};
use crate::core::native::GraphicsBackend;
use crate::core::pool::DEFAULT_FRAMES_TO_KEEP_ALIVE;
use crate::core::protocol::SceneControl;
use crate::core::textures::DEFAULT_RELEASE_AFTER_FRAMES;

/// Where to find the compositor library and which GPU API frames use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Explicit library path. When unset the library is located through the
    /// environment.
    pub path: Option<PathBuf>,
    pub graphics_backend: GraphicsBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub await_timeout_ms: u64,
    pub scene_control: SceneControl,
    pub stream_retry_interval_ms: u64,
    /// Stream enumerations before giving up on an empty stream set. Unset
    /// waits until streams appear.
    pub max_stream_polls: Option<usize>,
    /// Reported in the published schema when it carries none.
    pub engine_name: String,
    pub engine_version: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            await_timeout_ms: 500,
            scene_control: SceneControl::default(),
            stream_retry_interval_ms: 1000,
            max_stream_polls: None,
            engine_name: "renderstream-rs".to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ProtocolConfig {
    pub fn await_timeout(&self) -> Duration {
        Duration::from_millis(self.await_timeout_ms)
    }

    pub fn stream_retry_interval(&self) -> Duration {
        Duration::from_millis(self.stream_retry_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Frame boundaries a render-thread payload stays alive. At least 1.
    pub frames_to_keep_alive: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            frames_to_keep_alive: DEFAULT_FRAMES_TO_KEEP_ALIVE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TexturesConfig {
    pub temporary_release_after_frames: u32,
}

impl Default for TexturesConfig {
    fn default() -> Self {
        Self {
            temporary_release_after_frames: DEFAULT_RELEASE_AFTER_FRAMES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Followers expected besides this node. Below 1 disables cluster mode.
    pub repeater_count: u32,
    /// Network adapter name. The first non-loopback IPv4 adapter when unset.
    pub adapter: Option<String>,
    pub group: Ipv4Addr,
    pub port: u16,
    pub handshake_timeout_ms: u64,
    /// Budget for relay traffic once negotiation has finished.
    pub communication_timeout_ms: u64,
    pub announce_interval_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            repeater_count: 0,
            adapter: None,
            group: Ipv4Addr::new(224, 0, 1, 0),
            port: 25690,
            handshake_timeout_ms: 10_000,
            communication_timeout_ms: 5_000,
            announce_interval_ms: 100,
        }
    }
}

impl ClusterConfig {
    pub fn is_enabled(&self) -> bool {
        self.repeater_count >= 1
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn communication_timeout(&self) -> Duration {
        Duration::from_millis(self.communication_timeout_ms)
    }

    pub fn announce_interval(&self) -> Duration {
        Duration::from_millis(self.announce_interval_ms)
    }
}

/// Configuration from `renderstream.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStreamConfig {
    pub library: LibraryConfig,
    pub protocol: ProtocolConfig,
    pub pool: PoolConfig,
    pub textures: TexturesConfig,
    pub cluster: ClusterConfig,
}

impl RenderStreamConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "renderstream.toml";

    /// Load configuration from a directory. Returns an error if the file is
    /// missing or cannot be parsed.
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_file(&dir.join(Self::FILE_NAME))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RenderStreamError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            RenderStreamError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!("Loaded RenderStream config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from a directory, returning defaults if the file is
    /// missing or unparseable.
    pub fn load_or_default(dir: &Path) -> Self {
        let path = dir.join(Self::FILE_NAME);
        if !path.exists() {
            tracing::debug!("No {} found in {}, using defaults", Self::FILE_NAME, dir.display());
            return Self::default();
        }
        match Self::load_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Applies command-line overrides such as `-followers N`.
    pub fn apply_args<S: AsRef<str>>(&mut self, args: &[S]) {
        if let Some(followers) = followers_from_args(args) {
            self.cluster.repeater_count = followers;
        }
    }
}

/// Value of a `-followers N` argument pair, if present and numeric.
/// Negative counts read as 0.
pub fn followers_from_args<S: AsRef<str>>(args: &[S]) -> Option<u32> {
    let index = args.iter().position(|a| a.as_ref() == "-followers")?;
    let value = args.get(index + 1)?.as_ref().trim();
    match value.parse::<i64>() {
        Ok(count) => Some(u32::try_from(count.max(0)).unwrap_or(u32::MAX)),
        Err(_) => {
            tracing::warn!(value, "Ignoring non-numeric -followers argument");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RenderStreamConfig::default();
        assert_eq!(config.protocol.await_timeout(), Duration::from_millis(500));
        assert_eq!(config.protocol.scene_control, SceneControl::Selection);
        assert_eq!(config.pool.frames_to_keep_alive, 2);
        assert_eq!(config.textures.temporary_release_after_frames, 15);
        assert_eq!(config.cluster.group, Ipv4Addr::new(224, 0, 1, 0));
        assert_eq!(config.cluster.port, 25690);
        assert_eq!(config.cluster.handshake_timeout(), Duration::from_secs(10));
        assert!(!config.cluster.is_enabled());
    }

    #[test]
    fn test_load_missing_file_returns_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            RenderStreamConfig::load(dir.path()),
            Err(RenderStreamError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(RenderStreamConfig::FILE_NAME)).unwrap();
        write!(
            file,
            r#"
[library]
graphics_backend = "vulkan"

[protocol]
await_timeout_ms = 250
scene_control = "manual"

[cluster]
repeater_count = 3
adapter = "eth0"
"#
        )
        .unwrap();

        let config = RenderStreamConfig::load(dir.path()).unwrap();
        assert_eq!(config.library.graphics_backend, GraphicsBackend::Vulkan);
        assert_eq!(config.protocol.await_timeout_ms, 250);
        assert_eq!(config.protocol.scene_control, SceneControl::Manual);
        assert_eq!(config.protocol.stream_retry_interval_ms, 1000);
        assert_eq!(config.cluster.repeater_count, 3);
        assert_eq!(config.cluster.adapter.as_deref(), Some("eth0"));
        assert_eq!(config.cluster.announce_interval_ms, 100);
        assert_eq!(config.pool, PoolConfig::default());
    }

    #[test]
    fn test_parse_error_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(RenderStreamConfig::FILE_NAME),
            "[protocol]\nawait_timeout_ms = \"soon\"\n",
        )
        .unwrap();
        assert!(RenderStreamConfig::load(dir.path()).is_err());
        assert_eq!(
            RenderStreamConfig::load_or_default(dir.path()),
            RenderStreamConfig::default()
        );
    }

    #[test]
    fn test_followers_from_args() {
        assert_eq!(followers_from_args(&["app", "-followers", "2"]), Some(2));
        assert_eq!(followers_from_args(&["app", "-followers", "-1"]), Some(0));
        assert_eq!(followers_from_args(&["app", "-followers"]), None);
        assert_eq!(followers_from_args(&["app", "-followers", "many"]), None);
        assert_eq!(followers_from_args::<&str>(&[]), None);

        let mut config = RenderStreamConfig::default();
        config.apply_args(&["app".to_string(), "-followers".to_string(), "4".to_string()]);
        assert_eq!(config.cluster.repeater_count, 4);
        assert!(config.cluster.is_enabled());
    }
}
