//! The export pipeline: a timeline snapshot in, one MP4 out.

use std::sync::Arc;

use bytes::Bytes;

use sr_core::config::RenderConfig;
use sr_core::{Error, ExportId, Result, Track};
use sr_engine::EngineHandle;
use sr_timeline::{AssetCatalog, TimelineSegment};

use crate::context::{sweep, RenderContext};
use crate::fetch::SourceFetcher;
use crate::progress::{ProgressReporter, RenderLog};
use crate::stage::Stage;
use crate::stages::default_stages;

/// A point-in-time copy of what to export.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub export_id: ExportId,
    pub segments: Vec<TimelineSegment>,
    pub assets: AssetCatalog,
}

impl RenderRequest {
    pub fn new(segments: Vec<TimelineSegment>, assets: AssetCatalog) -> Self {
        Self {
            export_id: ExportId::new(),
            segments,
            assets,
        }
    }
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub export_id: ExportId,
    /// The MP4 file.
    pub data: Bytes,
    pub log: RenderLog,
    /// Main-track segments that made it into the video.
    pub clips_rendered: usize,
    /// Main-track segments that were dropped.
    pub clips_skipped: usize,
    pub audio_mixed: bool,
    /// Names of the stages that ran.
    pub stages: Vec<&'static str>,
}

impl RenderOutput {
    /// Whether content was dropped along the way.
    pub fn is_degraded(&self) -> bool {
        self.log.warnings() > 0
    }
}

pub struct RenderPipeline {
    engine: EngineHandle,
    fetcher: Arc<dyn SourceFetcher>,
    config: RenderConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl RenderPipeline {
    pub fn new(engine: EngineHandle, fetcher: Arc<dyn SourceFetcher>, config: RenderConfig) -> Self {
        Self {
            engine,
            fetcher,
            config,
            stages: default_stages(),
        }
    }

    /// Render `request`, reporting through `progress`.
    ///
    /// Fails immediately with [`Error::Precondition`] when there is nothing
    /// on the main track, and with [`Error::Render`] when a stage cannot
    /// continue. Skipped clips and a failed audio mix do not fail the export;
    /// they are recorded in the returned log. The engine is held for the
    /// whole export and every file the export created is gone afterwards.
    pub async fn render(
        &self,
        request: RenderRequest,
        progress: ProgressReporter,
    ) -> Result<RenderOutput> {
        let RenderRequest {
            export_id,
            segments,
            assets,
        } = request;

        let mut main: Vec<TimelineSegment> = segments
            .iter()
            .filter(|s| s.track == Track::MainVideo)
            .cloned()
            .collect();
        if main.is_empty() {
            return Err(Error::Precondition(
                "the main video track is empty; nothing to export".into(),
            ));
        }
        // Stable, so equal starts keep store order.
        main.sort_by_key(|s| s.start_frame);
        let audio: Vec<TimelineSegment> = segments
            .into_iter()
            .filter(|s| s.track == Track::Audio)
            .collect();

        tracing::info!(
            "export {export_id}: {} clips, {} audio segments",
            main.len(),
            audio.len()
        );

        let progress = Arc::new(progress);
        progress.report(0.0, "Starting export");
        let mut engine = self.engine.session().await?;

        let mut ctx = RenderContext::new(
            export_id,
            self.config.clone(),
            self.fetcher.clone(),
            progress.clone(),
            assets,
            main,
            audio,
        );
        let mut ran = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            if !stage.applies(&ctx) {
                tracing::debug!("export {export_id}: {} not needed", stage.name());
                continue;
            }
            tracing::info!("export {export_id}: starting {}", stage.name());
            progress.report(stage.progress_range().0, stage.name());

            if let Err(e) = stage.run(&mut ctx, &mut *engine).await {
                tracing::error!("export {export_id}: {} failed: {e}", stage.name());
                sweep(&mut *engine, ctx.namespace()).await;
                return Err(e);
            }
            ran.push(stage.name());
        }
        sweep(&mut *engine, ctx.namespace()).await;
        drop(engine);

        let data = ctx
            .data
            .take()
            .ok_or_else(|| Error::Internal("export finished without output".into()))?;

        progress.finish("Export complete");
        tracing::info!(
            "export {export_id}: done, {} bytes, {} warnings",
            data.len(),
            ctx.log.warnings()
        );

        Ok(RenderOutput {
            export_id,
            data,
            clips_rendered: ctx.clips.len(),
            clips_skipped: ctx.clip_failures.len(),
            audio_mixed: ctx.audio_mixed,
            log: ctx.log,
            stages: ran,
        })
    }
}
