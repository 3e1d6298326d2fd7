//! Media surfaces and the commands that keep them in step with the clock.
//!
//! A surface is a dumb player (a video or audio element). Each tick the
//! controller compares what a surface reports against where the program
//! says it should be and emits the smallest set of [`SurfaceCommand`]s that
//! closes the gap. Planning is pure; [`apply`] performs the commands.

use async_trait::async_trait;

use sr_core::{MediaKind, Result};
use sr_timeline::TimelineSegment;

use crate::resolver::local_time;

/// What a surface reports about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceSnapshot {
    pub source: Option<String>,
    pub current_time: f64,
    pub paused: bool,
    pub visible: bool,
    pub muted: bool,
}

/// Signals a surface raises on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The loaded source's metadata is available.
    MetadataLoaded { duration: f64 },
}

/// One adjustment to a surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Load(String),
    Clear,
    Seek(f64),
    Play,
    Pause,
    Show,
    Hide,
    Mute(bool),
}

#[async_trait]
pub trait MediaSurface: Send {
    fn snapshot(&self) -> SurfaceSnapshot;

    fn set_source(&mut self, source: Option<&str>);

    fn set_current_time(&mut self, secs: f64);

    /// May be rejected when interrupted by a pause.
    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    fn set_visible(&mut self, visible: bool);

    fn set_muted(&mut self, muted: bool);

    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<SurfaceEvent>;
}

/// How one surface should follow its track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncTarget<'a> {
    pub segment: Option<&'a TimelineSegment>,
    /// Program time in seconds.
    pub time: f64,
    pub playing: bool,
    pub muted: bool,
    /// Re-seek only when further off than this, in seconds.
    pub tolerance: f64,
}

/// Commands that bring `observed` in line with `target`.
///
/// A new source is loaded only when it differs from the current one. Time is
/// corrected only when the surface has drifted past the tolerance or a new
/// source was just loaded. An image segment parks and hides the surface;
/// no segment parks it and clears the source.
pub fn plan_sync(target: &SyncTarget<'_>, observed: &SurfaceSnapshot) -> Vec<SurfaceCommand> {
    let mut cmds = Vec::new();

    let Some(seg) = target.segment.filter(|s| s.kind != MediaKind::Image) else {
        if !observed.paused {
            cmds.push(SurfaceCommand::Pause);
        }
        match target.segment {
            Some(_) => {
                if observed.visible {
                    cmds.push(SurfaceCommand::Hide);
                }
            }
            None => {
                if observed.source.is_some() {
                    cmds.push(SurfaceCommand::Clear);
                }
            }
        }
        return cmds;
    };

    let reload = observed.source.as_deref() != Some(seg.location.as_str());
    if reload {
        cmds.push(SurfaceCommand::Load(seg.location.clone()));
    }

    let expected = local_time(target.time, seg);
    if reload || (observed.current_time - expected).abs() > target.tolerance {
        cmds.push(SurfaceCommand::Seek(expected));
    }

    if !observed.visible {
        cmds.push(SurfaceCommand::Show);
    }
    if observed.muted != target.muted {
        cmds.push(SurfaceCommand::Mute(target.muted));
    }

    // A freshly loaded source starts paused.
    let paused = observed.paused || reload;
    if target.playing && paused {
        cmds.push(SurfaceCommand::Play);
    } else if !target.playing && !paused {
        cmds.push(SurfaceCommand::Pause);
    }
    cmds
}

/// Perform `commands` in order. Play and pause rejections are expected
/// when the two race and are dropped.
pub async fn apply(surface: &mut dyn MediaSurface, commands: &[SurfaceCommand]) {
    for cmd in commands {
        match cmd {
            SurfaceCommand::Load(src) => surface.set_source(Some(src)),
            SurfaceCommand::Clear => surface.set_source(None),
            SurfaceCommand::Seek(t) => surface.set_current_time(*t),
            SurfaceCommand::Play => {
                if let Err(e) = surface.play().await {
                    tracing::debug!("surface play rejected: {e}");
                }
            }
            SurfaceCommand::Pause => {
                if let Err(e) = surface.pause().await {
                    tracing::debug!("surface pause rejected: {e}");
                }
            }
            SurfaceCommand::Show => surface.set_visible(true),
            SurfaceCommand::Hide => surface.set_visible(false),
            SurfaceCommand::Mute(m) => surface.set_muted(*m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_core::Track;
    use sr_timeline::Asset;

    fn video_at(start: i64) -> TimelineSegment {
        let asset = Asset::new(MediaKind::Video, "/m/clip.mp4", "clip").with_duration(4.0);
        TimelineSegment::from_asset(&asset, Track::MainVideo, start, 4.0)
    }

    fn target(segment: Option<&TimelineSegment>, time: f64, playing: bool) -> SyncTarget<'_> {
        SyncTarget {
            segment,
            time,
            playing,
            muted: false,
            tolerance: 0.3,
        }
    }

    fn in_sync(seg: &TimelineSegment, current_time: f64, paused: bool) -> SurfaceSnapshot {
        SurfaceSnapshot {
            source: Some(seg.location.clone()),
            current_time,
            paused,
            visible: true,
            muted: false,
        }
    }

    #[test]
    fn new_source_is_loaded_seeked_and_played() {
        let seg = video_at(30);
        let cmds = plan_sync(&target(Some(&seg), 2.0, true), &SurfaceSnapshot::default());
        assert_eq!(
            cmds,
            vec![
                SurfaceCommand::Load("/m/clip.mp4".into()),
                SurfaceCommand::Seek(1.0),
                SurfaceCommand::Show,
                SurfaceCommand::Play,
            ]
        );
    }

    #[test]
    fn small_drift_is_left_alone() {
        let seg = video_at(0);
        let cmds = plan_sync(&target(Some(&seg), 2.0, true), &in_sync(&seg, 2.25, false));
        assert!(cmds.is_empty(), "{cmds:?}");
    }

    #[test]
    fn large_drift_is_corrected() {
        let seg = video_at(0);
        let cmds = plan_sync(&target(Some(&seg), 2.0, true), &in_sync(&seg, 1.5, false));
        assert_eq!(cmds, vec![SurfaceCommand::Seek(2.0)]);
    }

    #[test]
    fn pause_mirrors_transport() {
        let seg = video_at(0);
        let cmds = plan_sync(&target(Some(&seg), 1.0, false), &in_sync(&seg, 1.0, false));
        assert_eq!(cmds, vec![SurfaceCommand::Pause]);
    }

    #[test]
    fn image_segment_parks_and_hides() {
        let still = Asset::new(MediaKind::Image, "/m/a.png", "a");
        let seg = TimelineSegment::from_asset(&still, Track::MainVideo, 0, 2.0);
        let other = video_at(0);
        let cmds = plan_sync(&target(Some(&seg), 1.0, true), &in_sync(&other, 1.0, false));
        assert_eq!(cmds, vec![SurfaceCommand::Pause, SurfaceCommand::Hide]);
    }

    #[test]
    fn empty_track_parks_and_clears() {
        let seg = video_at(0);
        let cmds = plan_sync(&target(None, 9.0, true), &in_sync(&seg, 4.0, false));
        assert_eq!(cmds, vec![SurfaceCommand::Pause, SurfaceCommand::Clear]);
        let idle = SurfaceSnapshot {
            paused: true,
            ..SurfaceSnapshot::default()
        };
        assert!(plan_sync(&target(None, 9.0, true), &idle).is_empty());
    }

    #[test]
    fn mute_follows_target() {
        let seg = video_at(0);
        let mut t = target(Some(&seg), 1.0, true);
        t.muted = true;
        let cmds = plan_sync(&t, &in_sync(&seg, 1.0, false));
        assert_eq!(cmds, vec![SurfaceCommand::Mute(true)]);
    }
}
