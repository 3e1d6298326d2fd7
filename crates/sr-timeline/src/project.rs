//! The on-disk project document: asset catalog plus timeline segments.

use serde::{Deserialize, Serialize};
use std::path::Path;

use sr_core::{Error, Result};

use crate::asset::AssetCatalog;
use crate::segment::TimelineSegment;
use crate::store::{validate_duration, SegmentStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub assets: AssetCatalog,
    #[serde(default)]
    pub segments: Vec<TimelineSegment>,
}

impl Project {
    /// Parse a project. A segment whose duration the store would refuse
    /// rejects the whole document.
    pub fn from_json(json: &str) -> Result<Self> {
        let project: Self = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("project parse error: {e}")))?;
        for seg in &project.segments {
            validate_duration(seg.duration)
                .map_err(|e| Error::Validation(format!("segment {}: {e}", seg.id)))?;
        }
        Ok(project)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("project serialize error: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let project = Self::from_json(&contents)?;
        tracing::debug!(
            "loaded project {}: {} assets, {} segments",
            path.display(),
            project.assets.len(),
            project.segments.len()
        );
        Ok(project)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Non-fatal problems with the document.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for seg in &self.segments {
            if self.assets.get(seg.asset_id).is_none() {
                warnings.push(format!(
                    "segment {} references asset {} which is not in the catalog",
                    seg.id, seg.asset_id
                ));
            }
            if !seg.is_consistent() {
                warnings.push(format!(
                    "segment {} end frame {} disagrees with its {}s duration",
                    seg.id, seg.end_frame, seg.duration
                ));
            }
            if !(seg.duration.is_finite() && seg.duration > 0.0) {
                warnings.push(format!("segment {} has non-positive duration", seg.id));
            }
            if let Some(link) = seg.linked_segment_id {
                if !self.segments.iter().any(|s| s.id == link) {
                    warnings.push(format!("segment {} links to missing segment {link}", seg.id));
                }
            }
        }
        warnings
    }

    /// Split into the catalog and a repaired segment store.
    pub fn into_parts(self) -> (AssetCatalog, SegmentStore) {
        (self.assets, SegmentStore::from_segments(self.segments))
    }

    pub fn from_parts(assets: AssetCatalog, store: &SegmentStore) -> Self {
        Self {
            assets,
            segments: store.snapshot(),
        }
    }
}
