//! Studio settings, read from a JSON file.
//!
//! Every field has a default, so `{}` is a complete configuration and a
//! file only needs to mention what it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub render: RenderConfig,
    pub playback: PlaybackConfig,
    pub fetch: FetchConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Reads `path` if given. A missing or unreadable file falls back to the
    /// defaults with a log line rather than an error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file absent, using defaults");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config file");
                return Self::default();
            }
        };
        Self::from_json(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            Self::default()
        })
    }

    /// Non-fatal problems worth telling the user about.
    pub fn validate(&self) -> Vec<String> {
        let mut out = Vec::new();
        let RenderConfig {
            width,
            height,
            fps,
            ref pixel_format,
            default_still_secs,
            ..
        } = self.render;

        if width == 0 || height == 0 {
            out.push(format!("render size {width}x{height} has a zero dimension"));
        } else if width % 2 == 1 || height % 2 == 1 {
            out.push(format!(
                "render size {width}x{height} is odd; {pixel_format} needs both sides even"
            ));
        }
        if fps == 0 {
            out.push("render.fps is 0".to_string());
        }
        if default_still_secs <= 0.0 {
            out.push("render.default_still_secs should be above zero".to_string());
        }

        if self.playback.tick_hz == 0 {
            out.push("playback.tick_hz is 0, so the clock never advances".to_string());
        }
        if self.playback.drift_tolerance_secs <= 0.0 {
            out.push(
                "playback.drift_tolerance_secs should be above zero or every tick re-seeks"
                    .to_string(),
            );
        }

        for (key, path) in [
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path.as_deref().filter(|p| !p.exists()) {
                out.push(format!(
                    "tools.{key} {} not found, falling back to PATH",
                    p.display()
                ));
            }
        }

        out
    }
}

/// Explicit tool locations; `None` means look them up on `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Output format of an export. Every main-track clip is first normalized to
/// exactly this so the concat step can copy streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pixel_format: String,
    pub video_codec: String,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Per-command time limit.
    pub exec_timeout_secs: u64,
    /// Length given to a dropped still.
    pub default_still_secs: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            pixel_format: "yuv420p".to_string(),
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            exec_timeout_secs: 600,
            default_still_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tick_hz: u32,
    /// Largest tolerated gap between a surface and the clock before a seek.
    pub drift_tolerance_secs: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            drift_tolerance_secs: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}
