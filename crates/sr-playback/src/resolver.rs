//! Which segment is active on each track at a given time.
//!
//! Resolution is a pure function of a time and a segment snapshot: a linear
//! first-match scan per track, in store order. A segment covers the
//! half-open range `[start_frame, end_frame)`, so two abutting segments
//! never both claim the boundary frame. When segments on one track overlap,
//! the one earlier in store order wins.

use sr_core::{Track, FRAME_RATE};
use sr_timeline::TimelineSegment;

/// The active segment per track, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActiveSegments<'a> {
    pub frame: i64,
    pub main: Option<&'a TimelineSegment>,
    pub overlay: Option<&'a TimelineSegment>,
    pub audio: Option<&'a TimelineSegment>,
}

impl<'a> ActiveSegments<'a> {
    pub fn on(&self, track: Track) -> Option<&'a TimelineSegment> {
        match track {
            Track::MainVideo => self.main,
            Track::Overlay => self.overlay,
            Track::Audio => self.audio,
        }
    }
}

/// Tolerance for times that land a rounding error short of a frame edge.
const FRAME_EPSILON: f64 = 1e-6;

/// The frame containing `secs`.
pub fn time_to_frame(secs: f64) -> i64 {
    if !secs.is_finite() {
        return 0;
    }
    (secs * f64::from(FRAME_RATE) + FRAME_EPSILON).floor() as i64
}

/// First segment on `track` whose range contains `frame`.
pub fn active_on(track: Track, frame: i64, segments: &[TimelineSegment]) -> Option<&TimelineSegment> {
    segments
        .iter()
        .find(|s| s.track == track && s.contains_frame(frame))
}

pub fn resolve_frame(frame: i64, segments: &[TimelineSegment]) -> ActiveSegments<'_> {
    ActiveSegments {
        frame,
        main: active_on(Track::MainVideo, frame, segments),
        overlay: active_on(Track::Overlay, frame, segments),
        audio: active_on(Track::Audio, frame, segments),
    }
}

/// Resolve every track at program time `secs`.
pub fn resolve(secs: f64, segments: &[TimelineSegment]) -> ActiveSegments<'_> {
    resolve_frame(time_to_frame(secs), segments)
}

/// Where inside `segment` the program time `secs` falls, in seconds.
pub fn local_time(secs: f64, segment: &TimelineSegment) -> f64 {
    (secs - segment.start_seconds()).max(0.0)
}
