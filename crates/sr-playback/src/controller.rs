//! Per-tick driver tying the clock, the resolver and the two surfaces.

use serde::Serialize;

use sr_core::config::PlaybackConfig;
use sr_core::{AssetId, MediaKind};
use sr_timeline::{Asset, OverlayPlacement, TimelineSegment};

use crate::clock::{PlaybackMode, TransportState};
use crate::resolver::resolve;
use crate::surface::{
    apply, plan_sync, MediaSurface, SurfaceCommand, SurfaceEvent, SurfaceSnapshot, SyncTarget,
};

/// What fills the main picture area.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MainView {
    /// The video surface is showing.
    Video { location: String },
    /// A still drawn directly; the video surface is hidden.
    Image { location: String },
    Empty,
}

/// A static overlay image at a normalized position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayView {
    pub location: String,
    pub x: f64,
    pub y: f64,
}

/// What the preview shows after a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub frame: i64,
    pub main: MainView,
    pub overlay: Option<OverlayView>,
    /// Source on the audio surface, if one is playing.
    pub audio: Option<String>,
}

impl Composition {
    fn empty(frame: i64) -> Self {
        Self {
            frame,
            main: MainView::Empty,
            overlay: None,
            audio: None,
        }
    }
}

#[derive(Debug, Clone)]
struct PreviewAsset {
    id: AssetId,
    kind: MediaKind,
    location: String,
}

/// Keeps a video surface and an audio surface following the program.
///
/// Each surface is synchronized to the transport time on its own; neither
/// follows the other. In timeline mode the video surface stays muted since
/// program sound comes from the audio track.
pub struct PlaybackController {
    video: Box<dyn MediaSurface>,
    audio: Box<dyn MediaSurface>,
    tolerance: f64,
    preview: Option<PreviewAsset>,
    preview_duration: Option<f64>,
}

impl PlaybackController {
    pub fn new(video: Box<dyn MediaSurface>, audio: Box<dyn MediaSurface>, config: &PlaybackConfig) -> Self {
        Self {
            video,
            audio,
            tolerance: config.drift_tolerance_secs,
            preview: None,
            preview_duration: None,
        }
    }

    /// Remember `asset` for preview mode. The clock's mode switch is separate.
    pub fn set_preview(&mut self, asset: &Asset) {
        if self.preview.as_ref().map(|p| p.id) != Some(asset.id) {
            self.preview_duration = asset.duration;
        }
        self.preview = Some(PreviewAsset {
            id: asset.id,
            kind: asset.kind,
            location: asset.location.clone(),
        });
    }

    /// Duration reported by the surface for the previewed asset.
    pub fn preview_duration(&self) -> Option<f64> {
        self.preview_duration
    }

    pub fn video_snapshot(&self) -> SurfaceSnapshot {
        self.video.snapshot()
    }

    pub fn audio_snapshot(&self) -> SurfaceSnapshot {
        self.audio.snapshot()
    }

    /// Bring both surfaces in line with `state` and describe the picture.
    pub async fn sync(&mut self, state: &TransportState, segments: &[TimelineSegment]) -> Composition {
        self.drain_events();
        match state.mode {
            PlaybackMode::TimelinePlayback => self.sync_timeline(state, segments).await,
            PlaybackMode::AssetPreview(id) => self.sync_preview(id).await,
        }
    }

    async fn sync_timeline(&mut self, state: &TransportState, segments: &[TimelineSegment]) -> Composition {
        let active = resolve(state.time, segments);

        let video_target = SyncTarget {
            segment: active.main,
            time: state.time,
            playing: state.playing,
            muted: true,
            tolerance: self.tolerance,
        };
        let cmds = plan_sync(&video_target, &self.video.snapshot());
        apply(self.video.as_mut(), &cmds).await;

        let audio_segment = active.audio.filter(|s| s.kind != MediaKind::Image);
        let audio_target = SyncTarget {
            segment: audio_segment,
            time: state.time,
            playing: state.playing,
            muted: false,
            tolerance: self.tolerance,
        };
        let cmds = plan_sync(&audio_target, &self.audio.snapshot());
        apply(self.audio.as_mut(), &cmds).await;

        let main = match active.main {
            Some(s) if s.kind == MediaKind::Image => MainView::Image {
                location: s.location.clone(),
            },
            Some(s) => MainView::Video {
                location: s.location.clone(),
            },
            None => MainView::Empty,
        };
        let overlay = active.overlay.map(|s| {
            let p = s.placement.unwrap_or_else(OverlayPlacement::centered);
            OverlayView {
                location: s.location.clone(),
                x: p.x,
                y: p.y,
            }
        });

        Composition {
            frame: active.frame,
            main,
            overlay,
            audio: audio_segment.map(|s| s.location.clone()),
        }
    }

    async fn sync_preview(&mut self, id: AssetId) -> Composition {
        let mut comp = Composition::empty(0);

        // The audio surface is silent while previewing.
        let snapshot = self.audio.snapshot();
        if !snapshot.paused {
            apply(self.audio.as_mut(), &[SurfaceCommand::Pause]).await;
        }

        let Some(preview) = self.preview.clone().filter(|p| p.id == id) else {
            tracing::debug!("preview of asset {id} requested before it was set");
            return comp;
        };

        let video = self.video.snapshot();
        let mut cmds = Vec::new();
        match preview.kind {
            MediaKind::Image => {
                if !video.paused {
                    cmds.push(SurfaceCommand::Pause);
                }
                if video.visible {
                    cmds.push(SurfaceCommand::Hide);
                }
                comp.main = MainView::Image {
                    location: preview.location,
                };
            }
            MediaKind::Video | MediaKind::Audio => {
                if video.source.as_deref() != Some(preview.location.as_str()) {
                    cmds.push(SurfaceCommand::Load(preview.location.clone()));
                    cmds.push(SurfaceCommand::Seek(0.0));
                }
                if !video.visible {
                    cmds.push(SurfaceCommand::Show);
                }
                if video.muted {
                    cmds.push(SurfaceCommand::Mute(false));
                }
                comp.main = MainView::Video {
                    location: preview.location,
                };
            }
        }
        apply(self.video.as_mut(), &cmds).await;
        comp
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.video.poll_event() {
            match event {
                SurfaceEvent::MetadataLoaded { duration } => {
                    if self.preview.is_some() {
                        tracing::debug!("preview metadata loaded: {duration:.2}s");
                        self.preview_duration = Some(duration);
                    }
                }
            }
        }
        // Audio metadata carries nothing the controller needs.
        while self.audio.poll_event().is_some() {}
    }
}
