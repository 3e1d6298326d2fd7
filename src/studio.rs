//! The studio: one timeline, one transport clock and one export slot.
//!
//! Every timeline mutation goes through [`Studio`] so the clock's program
//! length and the event bus stay current. Export and playback never overlap:
//! starting an export pauses the clock, and the clock refuses to play while
//! an export runs.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use sr_core::config::Config;
use sr_core::events::{EventBus, EventPayload};
use sr_core::{frames_to_seconds, AssetId, Error, ExportId, Result, SegmentId, Track};
use sr_engine::EngineHandle;
use sr_playback::{spawn_ticker, TickerHandle, TransportClock, TransportState};
use sr_render::{
    LocationFetcher, ProgressReporter, RenderOutput, RenderPipeline, RenderRequest, SourceFetcher,
};
use sr_timeline::{
    materialize_storyboard, Asset, AssetCatalog, Placement, Project, SegmentPatch, SegmentStore,
    StoryboardShot, TimelineSegment,
};

/// Where the single export slot stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportStatus {
    Idle,
    Running {
        export_id: ExportId,
        progress: f32,
        stage: String,
    },
    Succeeded {
        export_id: ExportId,
        bytes: u64,
        /// Diagnostic lines, including skipped content.
        log: Vec<String>,
    },
    Failed {
        export_id: ExportId,
        error: String,
    },
}

impl ExportStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    fn export_id(&self) -> Option<ExportId> {
        match self {
            Self::Idle => None,
            Self::Running { export_id, .. }
            | Self::Succeeded { export_id, .. }
            | Self::Failed { export_id, .. } => Some(*export_id),
        }
    }
}

pub struct Studio {
    config: Config,
    catalog: AssetCatalog,
    store: SegmentStore,
    clock: Arc<Mutex<TransportClock>>,
    events: Arc<EventBus>,
    pipeline: RenderPipeline,
    export: Arc<Mutex<ExportStatus>>,
}

impl Studio {
    pub fn new(config: Config, engine: EngineHandle, fetcher: Arc<dyn SourceFetcher>) -> Self {
        let pipeline = RenderPipeline::new(engine, fetcher, config.render.clone());
        Self {
            config,
            catalog: AssetCatalog::new(),
            store: SegmentStore::new(),
            clock: Arc::new(Mutex::new(TransportClock::new())),
            events: Arc::new(EventBus::default()),
            pipeline,
            export: Arc::new(Mutex::new(ExportStatus::Idle)),
        }
    }

    /// A studio backed by the process-wide ffmpeg engine.
    pub fn from_config(config: Config) -> Result<Self> {
        let engine = EngineHandle::global(&config);
        let fetcher = Arc::new(LocationFetcher::from_config(&config.fetch)?);
        Ok(Self::new(config, engine, fetcher))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn segments(&self) -> &[TimelineSegment] {
        self.store.segments()
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    // -- Project ------------------------------------------------------------

    /// Replace the catalog and timeline with `project`'s.
    pub fn load_project(&mut self, project: Project) {
        for warning in project.validate() {
            tracing::warn!("project: {warning}");
        }
        let (catalog, store) = project.into_parts();
        self.catalog = catalog;
        self.store = store;
        self.timeline_changed();
    }

    pub fn project(&self) -> Project {
        Project::from_parts(self.catalog.clone(), &self.store)
    }

    // -- Timeline handlers --------------------------------------------------

    pub fn add_asset(&mut self, asset: Asset) -> Result<AssetId> {
        self.catalog.insert(asset)
    }

    /// Drop a library asset onto `track` at `drop_secs`.
    pub fn place_asset(&mut self, asset_id: AssetId, track: Track, drop_secs: f64) -> Result<Placement> {
        let asset = self.catalog.require(asset_id)?.clone();
        let placement = self.store.place_asset(
            &asset,
            track,
            drop_secs,
            self.config.render.default_still_secs,
        )?;
        self.timeline_changed();
        Ok(placement)
    }

    /// Place an approved storyboard at the end of the main track.
    pub fn materialize_storyboard(&mut self, shots: &[StoryboardShot]) -> Result<Vec<SegmentId>> {
        let at = self
            .store
            .on_track(Track::MainVideo)
            .map(|s| s.end_frame)
            .max()
            .unwrap_or(0);
        let ids = materialize_storyboard(
            &mut self.store,
            &self.catalog,
            shots,
            at,
            self.config.render.default_still_secs,
        )?;
        self.timeline_changed();
        Ok(ids)
    }

    pub fn update_segment(&mut self, id: SegmentId, patch: SegmentPatch) -> Result<()> {
        self.store.update(id, patch)?;
        self.timeline_changed();
        Ok(())
    }

    pub fn remove_segment(&mut self, id: SegmentId) -> Result<TimelineSegment> {
        let removed = self.store.remove(id)?;
        self.timeline_changed();
        Ok(removed)
    }

    pub fn unlink_segment(&mut self, id: SegmentId) -> Result<()> {
        self.store.unlink(id)?;
        self.timeline_changed();
        Ok(())
    }

    fn timeline_changed(&self) {
        let secs = frames_to_seconds(self.store.end_frame());
        self.clock.lock().set_duration(secs);
        self.events.broadcast(EventPayload::TimelineChanged {
            segments: self.store.len(),
        });
    }

    // -- Transport ----------------------------------------------------------

    pub fn transport(&self) -> TransportState {
        self.clock.lock().state()
    }

    /// Start timeline playback. Refused while an export is running.
    pub fn play(&self) -> Result<()> {
        if self.export.lock().is_running() {
            return Err(Error::Conflict("cannot play while an export is running".into()));
        }
        let changed = {
            let mut clock = self.clock.lock();
            let before = clock.mode();
            clock.play();
            before != clock.mode()
        };
        if changed {
            self.mode_changed();
        }
        Ok(())
    }

    pub fn pause(&self) {
        self.clock.lock().pause();
    }

    pub fn seek(&self, secs: f64) {
        let changed = {
            let mut clock = self.clock.lock();
            let before = clock.mode();
            clock.seek(secs);
            before != clock.mode()
        };
        if changed {
            self.mode_changed();
        }
    }

    /// Show one library asset in the preview area.
    pub fn preview_asset(&self, id: AssetId) -> Result<()> {
        self.catalog.require(id)?;
        if self.clock.lock().preview_asset(id) {
            self.mode_changed();
        }
        Ok(())
    }

    pub fn enter_timeline(&self) {
        if self.clock.lock().enter_timeline() {
            self.mode_changed();
        }
    }

    fn mode_changed(&self) {
        let mode = self.clock.lock().mode();
        tracing::debug!("playback mode: {mode}");
        self.events.broadcast(EventPayload::PlaybackModeChanged {
            mode: mode.to_string(),
        });
    }

    /// Run the transport clock at the configured rate until the handle is
    /// stopped or dropped.
    pub fn start_ticker<F>(&self, on_tick: F) -> TickerHandle
    where
        F: FnMut(TransportState) + Send + 'static,
    {
        spawn_ticker(self.clock.clone(), self.config.playback.tick_hz, on_tick)
    }

    // -- Export -------------------------------------------------------------

    pub fn export_status(&self) -> ExportStatus {
        self.export.lock().clone()
    }

    /// Render the current timeline to MP4.
    ///
    /// The timeline is snapshotted up front; later edits do not affect a
    /// running export. Only one export runs at a time.
    pub async fn export(&self) -> Result<RenderOutput> {
        let request = RenderRequest::new(self.store.snapshot(), self.catalog.clone());
        let export_id = request.export_id;
        {
            let mut status = self.export.lock();
            if status.is_running() {
                return Err(Error::Conflict("an export is already running".into()));
            }
            *status = ExportStatus::Running {
                export_id,
                progress: 0.0,
                stage: String::new(),
            };
        }
        self.clock.lock().pause();
        self.events.broadcast(EventPayload::ExportStarted { export_id });

        let events = self.events.clone();
        let status = self.export.clone();
        let reporter = ProgressReporter::new(move |progress, stage| {
            if let ExportStatus::Running {
                progress: p,
                stage: s,
                ..
            } = &mut *status.lock()
            {
                *p = progress;
                *s = stage.to_string();
            }
            events.broadcast(EventPayload::ExportProgress {
                export_id,
                progress,
                stage: stage.to_string(),
            });
        });

        match self.pipeline.render(request, reporter).await {
            Ok(output) => {
                let bytes = output.data.len() as u64;
                *self.export.lock() = ExportStatus::Succeeded {
                    export_id,
                    bytes,
                    log: output.log.lines(),
                };
                self.events.broadcast(EventPayload::ExportCompleted {
                    export_id,
                    bytes,
                    warnings: output.log.warnings(),
                });
                Ok(output)
            }
            Err(e) => {
                *self.export.lock() = ExportStatus::Failed {
                    export_id,
                    error: e.to_string(),
                };
                self.events.broadcast(EventPayload::ExportFailed {
                    export_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Close a finished or failed export. A running export cannot be
    /// dismissed.
    pub fn dismiss_export(&self) -> Result<()> {
        let mut status = self.export.lock();
        if status.is_running() {
            return Err(Error::Conflict("a running export cannot be dismissed".into()));
        }
        if let Some(export_id) = status.export_id() {
            *status = ExportStatus::Idle;
            drop(status);
            self.events.broadcast(EventPayload::ExportDismissed { export_id });
        }
        Ok(())
    }
}
