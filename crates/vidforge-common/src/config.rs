//! Application configuration types.
//!
//! The top-level [`Config`] carries every sub-config for the server, the
//! streaming layer, the cache, external tools, and transcoding. Every section
//! defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub streaming: StreamingConfig,
    pub cache: CacheConfig,
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
    pub probe: ProbeConfig,
}

impl Config {
    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.server.media_dir.is_dir() {
            warnings.push(format!(
                "server.media_dir {} does not exist or is not a directory",
                self.server.media_dir.display()
            ));
        }

        if self.cache.enabled && self.cache.max_chunk_bytes as usize > self.streaming.chunk_size {
            warnings.push(
                "cache.max_chunk_bytes exceeds streaming.chunk_size; cached ranges will be read in one piece"
                    .into(),
            );
        }

        if self.transcode.strict_mp4 && !self.transcode.enabled {
            warnings.push(
                "transcode.strict_mp4 is set but transcoding is disabled; every non-MP4 asset will be rejected"
                    .into(),
            );
        }

        if self.transcode.max_timeout_secs < self.transcode.timeout_base_secs {
            warnings.push(
                "transcode.max_timeout_secs is below timeout_base_secs; the cap wins".into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Read-only directory holding source assets.
    pub media_dir: PathBuf,
    /// Read-write directory for ephemeral transcoded derivatives.
    pub temp_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            media_dir: PathBuf::from("./media"),
            temp_dir: std::env::temp_dir().join("vidforge"),
        }
    }
}

/// Response streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Read buffer size per body chunk, in bytes.
    pub chunk_size: usize,
    /// Optional `Cache-Control` header for asset responses.
    pub cache_control: Option<String>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10 * MIB as usize,
            cache_control: None,
        }
    }
}

/// Descriptor and byte-chunk cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub metadata_ttl_secs: u64,
    pub chunk_ttl_secs: u64,
    pub max_descriptor_entries: usize,
    pub max_chunk_entries: usize,
    /// Ranged reads up to this many bytes are memoized.
    pub max_chunk_bytes: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metadata_ttl_secs: 24 * 60 * 60,
            chunk_ttl_secs: 60 * 60,
            max_descriptor_entries: 1024,
            max_chunk_entries: 256,
            max_chunk_bytes: 256 * 1024,
            cleanup_interval_secs: 300,
        }
    }
}

/// Optional overrides for external tool locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Fallback transcoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub enabled: bool,
    /// Refuse to serve non-MP4 assets when every conversion fails.
    pub strict_mp4: bool,
    pub video_codec: String,
    pub audio_codec: String,
    pub fallback_preset: String,
    pub fallback_crf: u32,
    pub timeout_base_secs: u64,
    pub timeout_secs_per_mib: u64,
    pub max_timeout_secs: u64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_mp4: false,
            video_codec: "libx264".into(),
            audio_codec: "aac".into(),
            fallback_preset: "medium".into(),
            fallback_crf: 23,
            timeout_base_secs: 60,
            timeout_secs_per_mib: 2,
            max_timeout_secs: 2 * 60 * 60,
        }
    }
}

impl TranscodeConfig {
    /// Wall-clock budget for converting a source of `size_bytes`.
    ///
    /// Grows linearly with the file size and is capped at
    /// `max_timeout_secs`.
    pub fn timeout_for(&self, size_bytes: u64) -> Duration {
        let size_mib = size_bytes.div_ceil(MIB);
        let secs = self
            .timeout_base_secs
            .saturating_add(self.timeout_secs_per_mib.saturating_mul(size_mib))
            .min(self.max_timeout_secs);
        Duration::from_secs(secs)
    }
}

/// ffprobe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
