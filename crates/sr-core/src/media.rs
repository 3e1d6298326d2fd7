//! Media-domain enums and timeline frame arithmetic.
//!
//! All enums serialize in snake_case and implement `Display` manually for
//! consistent string representation. Timeline positions are integer frames
//! at [`FRAME_RATE`]; seconds only appear at presentation boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical timeline frame rate. Every frame number in the crate family is
/// expressed in this base unit.
pub const FRAME_RATE: u32 = 30;

/// Longest duration a single segment may have: one day.
pub const MAX_SEGMENT_SECS: f64 = 86_400.0;

/// Convert seconds to the nearest whole frame.
pub fn seconds_to_frames(secs: f64) -> i64 {
    (secs * f64::from(FRAME_RATE)).round() as i64
}

/// Convert a frame number to seconds.
pub fn frames_to_seconds(frames: i64) -> f64 {
    frames as f64 / f64::from(FRAME_RATE)
}

/// Convert a frame number to whole milliseconds. Saturates at the `i64`
/// range instead of overflowing.
pub fn frames_to_millis(frames: i64) -> i64 {
    frames.saturating_mul(1000) / i64::from(FRAME_RATE)
}

/// Format seconds as `MM:SS:FF` (minutes, seconds, frames).
pub fn format_timecode(secs: f64) -> String {
    let total = seconds_to_frames(secs.max(0.0));
    let fps = i64::from(FRAME_RATE);
    let minutes = total / (fps * 60);
    let seconds = (total / fps) % 60;
    let frames = total % fps;
    format!("{minutes:02}:{seconds:02}:{frames:02}")
}

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

/// The kind of content an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// File extension used when nothing better is known about the source.
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
            Self::Audio => "mp3",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(crate::Error::Validation(format!("unknown media kind '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// One of the three fixed timeline lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    MainVideo,
    Overlay,
    Audio,
}

impl Track {
    /// All tracks in display order.
    pub const ALL: [Track; 3] = [Track::MainVideo, Track::Overlay, Track::Audio];
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainVideo => write!(f, "main_video"),
            Self::Overlay => write!(f, "overlay"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for Track {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "main_video" | "main" | "video" => Ok(Self::MainVideo),
            "overlay" => Ok(Self::Overlay),
            "audio" => Ok(Self::Audio),
            other => Err(crate::Error::Validation(format!("unknown track '{other}'"))),
        }
    }
}
