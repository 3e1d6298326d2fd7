//! Assets and the catalog that owns them.
//!
//! Assets never change after creation. An edit of an asset (a regenerated
//! image, a trimmed clip) is a new asset whose `parent_id` names the root of
//! its lineage.

use serde::{Deserialize, Serialize};

use sr_core::{AssetId, Error, MediaKind, Result};

/// An immutable content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub kind: MediaKind,
    /// Where the bytes live: a filesystem path, `file://`, `data:` or http(s) URL.
    pub location: String,
    /// Human-readable label shown in the library.
    pub label: String,
    /// Precomputed duration in seconds, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Root asset of the lineage this asset was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<AssetId>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl Asset {
    /// Create a root asset (version 1, no parent).
    pub fn new(kind: MediaKind, location: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: AssetId::new(),
            kind,
            location: location.into(),
            label: label.into(),
            duration: None,
            parent_id: None,
            version: default_version(),
        }
    }

    /// Builder: attach a known duration in seconds.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    /// The usable duration: the asset's own when positive and finite,
    /// otherwise `fallback`.
    pub fn duration_or(&self, fallback: f64) -> f64 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(fallback)
    }

    /// Id of the first asset in this asset's lineage.
    pub fn root_id(&self) -> AssetId {
        self.parent_id.unwrap_or(self.id)
    }
}

/// The global asset catalog. Iteration order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetCatalog {
    assets: Vec<Asset>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset. Ids are unique within the catalog.
    pub fn insert(&mut self, asset: Asset) -> Result<AssetId> {
        if self.get(asset.id).is_some() {
            return Err(Error::Conflict(format!("asset {} already in catalog", asset.id)));
        }
        let id = asset.id;
        tracing::debug!("catalog: added {} '{}' ({})", asset.kind, asset.label, id);
        self.assets.push(asset);
        Ok(id)
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Like [`get`](Self::get) but a missing asset is an error.
    pub fn require(&self, id: AssetId) -> Result<&Asset> {
        self.get(id).ok_or_else(|| Error::not_found("asset", id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Record a derived version of `parent`.
    ///
    /// The new asset keeps the parent's kind, points at the lineage root and
    /// takes the next version number within that lineage.
    pub fn derive(
        &mut self,
        parent: AssetId,
        location: impl Into<String>,
        label: impl Into<String>,
        duration: Option<f64>,
    ) -> Result<AssetId> {
        let parent = self.require(parent)?;
        let root = parent.root_id();
        let kind = parent.kind;
        let next = self
            .versions_of(root)
            .iter()
            .map(|a| a.version)
            .max()
            .unwrap_or(1)
            + 1;

        let asset = Asset {
            id: AssetId::new(),
            kind,
            location: location.into(),
            label: label.into(),
            duration,
            parent_id: Some(root),
            version: next,
        };
        self.insert(asset)
    }

    /// Every asset in the lineage rooted at `root`, ordered by version.
    pub fn versions_of(&self, root: AssetId) -> Vec<&Asset> {
        let mut versions: Vec<&Asset> = self
            .assets
            .iter()
            .filter(|a| a.id == root || a.parent_id == Some(root))
            .collect();
        versions.sort_by_key(|a| a.version);
        versions
    }

    /// Newest version in the lineage `id` belongs to.
    pub fn latest_version(&self, id: AssetId) -> Option<&Asset> {
        let root = self.get(id)?.root_id();
        self.versions_of(root).into_iter().last()
    }
}
