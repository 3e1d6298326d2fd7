//! The timeline placement unit.

use serde::{Deserialize, Serialize};

use sr_core::{
    frames_to_seconds, seconds_to_frames, AssetId, MediaKind, SegmentId, Track,
};

use crate::asset::Asset;

/// Normalized on-canvas anchor of an overlay segment. Both axes are in
/// `0.0..=1.0`, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlacement {
    pub x: f64,
    pub y: f64,
}

impl OverlayPlacement {
    /// Build a placement, clamping both axes into the canvas.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    pub fn centered() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.5
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// One asset placed on one track for the half-open frame range
/// `[start_frame, end_frame)`.
///
/// `end_frame == start_frame + round(duration * 30)` holds after every store
/// mutation. `location` and `kind` are denormalized from the asset so the
/// per-tick resolver never touches the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSegment {
    pub id: SegmentId,
    pub track: Track,
    pub start_frame: i64,
    pub end_frame: i64,
    /// Duration in seconds.
    pub duration: f64,
    pub asset_id: AssetId,
    pub location: String,
    pub kind: MediaKind,
    /// Soft reference to the partner of a decoupled audio/video pair. Moving
    /// the referenced segment drags this one along.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_segment_id: Option<SegmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<OverlayPlacement>,
}

impl TimelineSegment {
    /// Place `asset` on `track` starting at `start_frame` for `duration` seconds.
    pub fn from_asset(asset: &Asset, track: Track, start_frame: i64, duration: f64) -> Self {
        let mut segment = Self {
            id: SegmentId::new(),
            track,
            start_frame,
            end_frame: start_frame,
            duration,
            asset_id: asset.id,
            location: asset.location.clone(),
            kind: asset.kind,
            linked_segment_id: None,
            placement: (track == Track::Overlay).then(OverlayPlacement::centered),
        };
        segment.recompute_end();
        segment
    }

    /// Length in frames derived from `duration`.
    pub fn duration_frames(&self) -> i64 {
        seconds_to_frames(self.duration)
    }

    /// Re-derive `end_frame` from `start_frame` and `duration`.
    pub fn recompute_end(&mut self) {
        self.end_frame = self.derived_end();
    }

    /// Whether the stored end frame agrees with the duration.
    pub fn is_consistent(&self) -> bool {
        self.end_frame == self.derived_end()
    }

    fn derived_end(&self) -> i64 {
        self.start_frame.saturating_add(self.duration_frames())
    }

    /// Half-open containment: a segment is not active on its own end frame.
    pub fn contains_frame(&self, frame: i64) -> bool {
        frame >= self.start_frame && frame < self.end_frame
    }

    pub fn start_seconds(&self) -> f64 {
        frames_to_seconds(self.start_frame)
    }

    pub fn end_seconds(&self) -> f64 {
        frames_to_seconds(self.end_frame)
    }

    /// Shift both ends by `delta` frames.
    pub(crate) fn shift(&mut self, delta: i64) {
        self.start_frame = self.start_frame.saturating_add(delta);
        self.end_frame = self.end_frame.saturating_add(delta);
    }
}

/// A partial update applied by [`SegmentStore::update`](crate::SegmentStore::update).
///
/// `None` leaves a field untouched. For the link, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentPatch {
    pub track: Option<Track>,
    pub start_frame: Option<i64>,
    pub duration: Option<f64>,
    pub placement: Option<OverlayPlacement>,
    pub linked_segment_id: Option<Option<SegmentId>>,
}

impl SegmentPatch {
    /// Patch that moves a segment to `start_frame`.
    pub fn move_to(start_frame: i64) -> Self {
        Self {
            start_frame: Some(start_frame),
            ..Self::default()
        }
    }

    /// Patch that changes a segment's duration in seconds.
    pub fn resize(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Patch that repositions an overlay.
    pub fn place(x: f64, y: f64) -> Self {
        Self {
            placement: Some(OverlayPlacement::new(x, y)),
            ..Self::default()
        }
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.track = Some(track);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
