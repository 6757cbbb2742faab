//! Settings struct with TOML-based sections.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Encode behavior knobs.
    #[serde(default)]
    pub encode: EncodeSettings,
}

/// Paths (or bare names resolved via PATH) of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Encoder binary.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Probe binary.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Encode behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// Downscale target: video taller than this is scaled down to it.
    #[serde(default = "default_resolution_cap")]
    pub resolution_cap_height: u32,

    /// Minimum wall-time between outward progress events, milliseconds.
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// How long to wait after a graceful stop request before the
    /// encoder process is hard-killed, milliseconds.
    #[serde(default = "default_kill_grace")]
    pub kill_grace_ms: u64,

    /// Value passed to ffmpeg's `-stats_period`.
    #[serde(default = "default_stats_period")]
    pub stats_period: String,
}

fn default_resolution_cap() -> u32 {
    1080
}

fn default_progress_interval() -> u64 {
    200
}

fn default_kill_grace() -> u64 {
    1500
}

fn default_stats_period() -> String {
    "0.4".to_string()
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            resolution_cap_height: default_resolution_cap(),
            progress_interval_ms: default_progress_interval(),
            kill_grace_ms: default_kill_grace(),
            stats_period: default_stats_period(),
        }
    }
}
