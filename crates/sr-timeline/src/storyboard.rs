//! Materializing an approved storyboard onto the timeline.

use serde::{Deserialize, Serialize};

use sr_core::{AssetId, Error, MediaKind, Result, SegmentId, Track};

use crate::asset::AssetCatalog;
use crate::store::{validate_duration, SegmentStore};

/// One shot of a storyboard: the visual and an optional narration clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryboardShot {
    pub asset_id: AssetId,
    /// Overrides the asset's own duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<AssetId>,
}

impl StoryboardShot {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            duration: None,
            narration: None,
        }
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn with_narration(mut self, narration: AssetId) -> Self {
        self.narration = Some(narration);
        self
    }
}

/// Place `shots` back to back on the main track starting at `at_frame`.
///
/// Video shots get a linked audio segment; narration lands on the audio
/// track at the start of its shot. Shots are placed on a copy of the store
/// that replaces it only when all of them succeed, so a bad storyboard
/// leaves the timeline unchanged. Returns the
/// ids of the main-track segments in shot order.
pub fn materialize_storyboard(
    store: &mut SegmentStore,
    catalog: &AssetCatalog,
    shots: &[StoryboardShot],
    at_frame: i64,
    default_still_secs: f64,
) -> Result<Vec<SegmentId>> {
    let mut planned = Vec::with_capacity(shots.len());
    for (i, shot) in shots.iter().enumerate() {
        let visual = catalog.require(shot.asset_id)?;
        if visual.kind == MediaKind::Audio {
            return Err(Error::Validation(format!(
                "storyboard shot {i} ('{}') is audio; shots need an image or video",
                visual.label
            )));
        }
        let duration = shot
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| visual.duration_or(default_still_secs));

        let narration = match shot.narration {
            Some(id) => {
                let n = catalog.require(id)?;
                if n.kind != MediaKind::Audio {
                    return Err(Error::Validation(format!(
                        "storyboard shot {i}: narration '{}' is not audio",
                        n.label
                    )));
                }
                Some(n)
            }
            None => None,
        };
        validate_duration(duration)
            .map_err(|e| Error::Validation(format!("storyboard shot {i}: {e}")))?;
        if let Some(n) = narration {
            validate_duration(n.duration_or(duration))
                .map_err(|e| Error::Validation(format!("storyboard shot {i} narration: {e}")))?;
        }
        planned.push((visual, duration, narration));
    }

    // Built on a copy and swapped in only once every shot is placed.
    let mut staged = store.clone();
    let mut cursor = at_frame.max(0);
    let mut placed = Vec::with_capacity(planned.len());
    for (visual, duration, narration) in planned {
        let placement = staged.place_at_frame(visual, Track::MainVideo, cursor, duration)?;
        if let Some(n) = narration {
            staged.place_at_frame(n, Track::Audio, cursor, n.duration_or(duration))?;
        }
        let seg = staged
            .get(placement.primary)
            .ok_or_else(|| Error::Internal("placed segment vanished".into()))?;
        cursor = seg.end_frame;
        placed.push(placement.primary);
    }
    *store = staged;

    tracing::info!(
        "storyboard: materialized {} shots, timeline now ends at frame {cursor}",
        placed.len()
    );
    Ok(placed)
}
