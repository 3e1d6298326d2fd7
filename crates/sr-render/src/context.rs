//! State threaded through the stages of one export.

use std::sync::Arc;

use bytes::Bytes;

use sr_core::config::RenderConfig;
use sr_core::ExportId;
use sr_engine::TranscodeEngine;
use sr_timeline::{AssetCatalog, TimelineSegment};

use crate::fetch::SourceFetcher;
use crate::progress::{ProgressReporter, RenderLog};

pub struct RenderContext {
    pub export_id: ExportId,
    pub config: RenderConfig,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub progress: Arc<ProgressReporter>,
    pub assets: AssetCatalog,
    /// Main-track segments in ascending start order.
    pub main: Vec<TimelineSegment>,
    /// Audio-track segments in store order.
    pub audio: Vec<TimelineSegment>,
    pub log: RenderLog,

    /// Engine names of the normalized clips, in timeline order.
    pub clips: Vec<String>,
    /// One message per clip that could not be normalized.
    pub clip_failures: Vec<String>,
    /// The joined video-only file.
    pub video: Option<String>,
    /// The file to hand back: the muxed file, or `video` when there is no mix.
    pub output: Option<String>,
    pub audio_mixed: bool,
    pub data: Option<Bytes>,

    namespace: String,
}

impl RenderContext {
    pub fn new(
        export_id: ExportId,
        config: RenderConfig,
        fetcher: Arc<dyn SourceFetcher>,
        progress: Arc<ProgressReporter>,
        assets: AssetCatalog,
        main: Vec<TimelineSegment>,
        audio: Vec<TimelineSegment>,
    ) -> Self {
        Self {
            namespace: format!("exp{}", export_id.short()),
            export_id,
            config,
            fetcher,
            progress,
            assets,
            main,
            audio,
            log: RenderLog::default(),
            clips: Vec::new(),
            clip_failures: Vec::new(),
            video: None,
            output: None,
            audio_mixed: false,
            data: None,
        }
    }

    /// Prefix shared by every engine file this export creates.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Engine file name unique to this export, e.g. `exp1a2b3c4d_clip_0.mp4`.
    pub fn file_name(&self, role: &str, index: Option<usize>, ext: &str) -> String {
        match index {
            Some(i) => format!("{}_{role}_{i}.{ext}", self.namespace),
            None => format!("{}_{role}.{ext}", self.namespace),
        }
    }

    /// Human-readable name for log lines.
    pub fn describe(&self, segment: &TimelineSegment) -> String {
        match self.assets.get(segment.asset_id) {
            Some(asset) => format!("'{}'", asset.label),
            None => {
                let loc: String = segment.location.chars().take(60).collect();
                format!("'{loc}'")
            }
        }
    }
}

/// Delete engine files, ignoring ones that are already gone.
pub async fn discard(engine: &mut dyn TranscodeEngine, names: &[String]) {
    for name in names {
        if let Err(e) = engine.delete_file(name).await {
            tracing::debug!("engine: could not delete {name}: {e}");
        }
    }
}

/// Delete every engine file carrying `namespace`.
pub async fn sweep(engine: &mut dyn TranscodeEngine, namespace: &str) {
    let prefix = format!("{namespace}_");
    match engine.list_files().await {
        Ok(files) => {
            let stale: Vec<String> = files.into_iter().filter(|f| f.starts_with(&prefix)).collect();
            if !stale.is_empty() {
                tracing::debug!("engine: sweeping {} leftover files", stale.len());
            }
            discard(engine, &stale).await;
        }
        Err(e) => tracing::warn!("engine: could not list files for cleanup: {e}"),
    }
}
