//! The segment store: the only place timeline segments are mutated.
//!
//! Every mutation is synchronous and leaves the store consistent:
//! `end_frame` always agrees with `duration`, and no segment keeps a link to
//! an id that is no longer in the store.

use sr_core::{seconds_to_frames, Error, MediaKind, Result, SegmentId, Track, MAX_SEGMENT_SECS};

use crate::asset::Asset;
use crate::segment::{SegmentPatch, TimelineSegment};

/// Segments created by a single drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The segment for the dropped asset itself.
    pub primary: SegmentId,
    /// The synchronized audio segment created for a video dropped on Main-Video.
    pub linked_audio: Option<SegmentId>,
}

/// Ordered collection of timeline segments. Iteration order is insertion
/// order, which is also the resolver's tie-break order.
#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    segments: Vec<TimelineSegment>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously saved segments.
    ///
    /// End frames are re-derived from durations and links to ids that are
    /// not part of `segments` are dropped.
    pub fn from_segments(segments: Vec<TimelineSegment>) -> Self {
        let mut store = Self { segments };
        for seg in &mut store.segments {
            if !seg.is_consistent() {
                tracing::warn!(
                    "segment {}: end frame {} disagrees with duration {}s; re-deriving",
                    seg.id,
                    seg.end_frame,
                    seg.duration
                );
                seg.recompute_end();
            }
        }
        let ids: Vec<SegmentId> = store.segments.iter().map(|s| s.id).collect();
        for seg in &mut store.segments {
            if let Some(target) = seg.linked_segment_id {
                if !ids.contains(&target) {
                    tracing::warn!("segment {}: dropping dangling link to {target}", seg.id);
                    seg.linked_segment_id = None;
                }
            }
        }
        store
    }

    /// Append a segment. Only the id is checked for uniqueness.
    pub fn add(&mut self, mut segment: TimelineSegment) -> Result<SegmentId> {
        if self.get(segment.id).is_some() {
            return Err(Error::Conflict(format!("segment {} already exists", segment.id)));
        }
        validate_duration(segment.duration)?;
        segment.recompute_end();
        let id = segment.id;
        tracing::debug!(
            "timeline: add {} segment {} [{}, {})",
            segment.track,
            id,
            segment.start_frame,
            segment.end_frame
        );
        self.segments.push(segment);
        Ok(id)
    }

    /// Merge `patch` into the segment `id`.
    ///
    /// When the start frame changes, every segment whose link names `id` is
    /// shifted by the same frame delta. Only direct links are followed. A
    /// move that would take a follower below frame 0 stops where the
    /// earliest follower reaches 0.
    pub fn update(&mut self, id: SegmentId, patch: SegmentPatch) -> Result<()> {
        let idx = self.index_of(id)?;

        if let Some(duration) = patch.duration {
            validate_duration(duration)?;
        }
        if patch.linked_segment_id == Some(Some(id)) {
            return Err(Error::Validation(format!("segment {id} cannot link to itself")));
        }

        let lowest_follower = self
            .segments
            .iter()
            .filter(|s| s.id != id && s.linked_segment_id == Some(id))
            .map(|s| s.start_frame)
            .min();

        let seg = &mut self.segments[idx];
        let old_start = seg.start_frame;

        if let Some(track) = patch.track {
            seg.track = track;
        }
        if let Some(start) = patch.start_frame {
            if start < 0 {
                tracing::debug!("segment {id}: clamping start frame {start} to 0");
            }
            let mut start = start.max(0);
            // Followers move by the same delta and must stay at or after frame 0.
            if let Some(lowest) = lowest_follower {
                let floor = old_start - lowest.max(0);
                if start < floor {
                    tracing::debug!(
                        "segment {id}: start frame {start} would push a linked segment below 0; using {floor}"
                    );
                    start = floor;
                }
            }
            seg.start_frame = start;
        }
        if let Some(duration) = patch.duration {
            seg.duration = duration;
        }
        if let Some(placement) = patch.placement {
            seg.placement = Some(placement);
        }
        if let Some(link) = patch.linked_segment_id {
            seg.linked_segment_id = link;
        }
        seg.recompute_end();

        let delta = seg.start_frame - old_start;
        if delta != 0 {
            for other in self
                .segments
                .iter_mut()
                .filter(|s| s.id != id && s.linked_segment_id == Some(id))
            {
                other.shift(delta);
                tracing::debug!("segment {}: follows {id} by {delta} frames", other.id);
            }
        }
        Ok(())
    }

    /// Delete a segment and clear every link that pointed at it.
    pub fn remove(&mut self, id: SegmentId) -> Result<TimelineSegment> {
        let idx = self.index_of(id)?;
        let removed = self.segments.remove(idx);
        for seg in &mut self.segments {
            if seg.linked_segment_id == Some(id) {
                seg.linked_segment_id = None;
            }
        }
        tracing::debug!("timeline: removed {} segment {id}", removed.track);
        Ok(removed)
    }

    /// Make `dependent` follow `target` when `target` moves.
    pub fn link(&mut self, dependent: SegmentId, target: SegmentId) -> Result<()> {
        self.index_of(target)?;
        self.update(
            dependent,
            SegmentPatch {
                linked_segment_id: Some(Some(target)),
                ..SegmentPatch::default()
            },
        )
    }

    /// Dissolve the link relation `id` takes part in, on both sides.
    pub fn unlink(&mut self, id: SegmentId) -> Result<()> {
        let idx = self.index_of(id)?;
        let partner = self.segments[idx].linked_segment_id.take();
        for seg in &mut self.segments {
            let points_here = seg.linked_segment_id == Some(id);
            let is_partner_pointing_back =
                Some(seg.id) == partner && seg.linked_segment_id == Some(id);
            if points_here || is_partner_pointing_back {
                seg.linked_segment_id = None;
            }
        }
        Ok(())
    }

    /// The other half of `id`'s link relation, if it still exists.
    ///
    /// A link whose target is gone reads as "unlinked".
    pub fn linked_counterpart(&self, id: SegmentId) -> Option<&TimelineSegment> {
        let seg = self.get(id)?;
        if let Some(target) = seg.linked_segment_id {
            if let Some(found) = self.get(target) {
                return Some(found);
            }
        }
        self.segments
            .iter()
            .find(|s| s.id != id && s.linked_segment_id == Some(id))
    }

    /// Drop `asset` onto `track` at `drop_secs`.
    ///
    /// Audio assets always land on the audio track. A video dropped on the
    /// main track also gets an audio segment over the same frames that
    /// follows it when moved.
    pub fn place_asset(
        &mut self,
        asset: &Asset,
        track: Track,
        drop_secs: f64,
        default_still_secs: f64,
    ) -> Result<Placement> {
        let start = seconds_to_frames(drop_secs.max(0.0));
        let duration = asset.duration_or(default_still_secs);
        self.place_at_frame(asset, track, start, duration)
    }

    pub(crate) fn place_at_frame(
        &mut self,
        asset: &Asset,
        track: Track,
        start_frame: i64,
        duration: f64,
    ) -> Result<Placement> {
        let track = match (asset.kind, track) {
            (MediaKind::Audio, _) => Track::Audio,
            (MediaKind::Image, Track::Audio) => {
                return Err(Error::Validation(format!(
                    "image '{}' cannot be placed on the audio track",
                    asset.label
                )))
            }
            (_, t) => t,
        };

        let primary = self.add(TimelineSegment::from_asset(asset, track, start_frame, duration))?;

        let linked_audio = if asset.kind == MediaKind::Video && track == Track::MainVideo {
            let mut audio = TimelineSegment::from_asset(asset, Track::Audio, start_frame, duration);
            audio.linked_segment_id = Some(primary);
            Some(self.add(audio)?)
        } else {
            None
        };

        tracing::info!(
            "timeline: placed '{}' on {track} at frame {start_frame}{}",
            asset.label,
            if linked_audio.is_some() { " with linked audio" } else { "" }
        );
        Ok(Placement {
            primary,
            linked_audio,
        })
    }

    pub fn get(&self, id: SegmentId) -> Option<&TimelineSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// All segments in store order.
    pub fn segments(&self) -> &[TimelineSegment] {
        &self.segments
    }

    /// Segments on one track, in store order.
    pub fn on_track(&self, track: Track) -> impl Iterator<Item = &TimelineSegment> {
        self.segments.iter().filter(move |s| s.track == track)
    }

    /// Point-in-time copy for read-only consumers (resolver, render).
    pub fn snapshot(&self) -> Vec<TimelineSegment> {
        self.segments.clone()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Frame one past the last frame any segment covers.
    pub fn end_frame(&self) -> i64 {
        self.segments.iter().map(|s| s.end_frame).max().unwrap_or(0)
    }

    fn index_of(&self, id: SegmentId) -> Result<usize> {
        self.segments
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::not_found("segment", id))
    }
}

/// A duration must be finite, above zero and at most [`MAX_SEGMENT_SECS`].
pub(crate) fn validate_duration(duration: f64) -> Result<()> {
    if !(duration.is_finite() && duration > 0.0) {
        return Err(Error::Validation(format!(
            "segment duration must be a positive number of seconds, got {duration}"
        )));
    }
    if duration > MAX_SEGMENT_SECS {
        return Err(Error::Validation(format!(
            "segment duration {duration}s exceeds the {MAX_SEGMENT_SECS}s limit"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::OverlayPlacement;
    use assert_matches::assert_matches;

    fn asset(kind: MediaKind, secs: f64) -> Asset {
        Asset::new(kind, format!("/media/{kind}.bin"), kind.to_string()).with_duration(secs)
    }

    fn segment(track: Track, start: i64, secs: f64) -> TimelineSegment {
        TimelineSegment::from_asset(&asset(MediaKind::Video, secs), track, start, secs)
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut store = SegmentStore::new();
        let a = store.add(segment(Track::MainVideo, 100, 1.0)).unwrap();
        let b = store.add(segment(Track::MainVideo, 0, 1.0)).unwrap();
        let ids: Vec<_> = store.segments().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut store = SegmentStore::new();
        let seg = segment(Track::MainVideo, 0, 1.0);
        store.add(seg.clone()).unwrap();
        assert_matches!(store.add(seg), Err(Error::Conflict(_)));
    }

    #[test]
    fn add_rejects_non_positive_duration() {
        let mut store = SegmentStore::new();
        let mut seg = segment(Track::MainVideo, 0, 1.0);
        seg.duration = 0.0;
        assert_matches!(store.add(seg), Err(Error::Validation(_)));
    }

    #[test]
    fn move_recomputes_end_from_duration() {
        let mut store = SegmentStore::new();
        let id = store.add(segment(Track::MainVideo, 0, 4.0)).unwrap();
        store.update(id, SegmentPatch::move_to(45)).unwrap();
        let seg = store.get(id).unwrap();
        assert_eq!((seg.start_frame, seg.end_frame), (45, 165));
    }

    #[test]
    fn resize_recomputes_end() {
        let mut store = SegmentStore::new();
        let id = store.add(segment(Track::MainVideo, 30, 4.0)).unwrap();
        store.update(id, SegmentPatch::resize(2.0)).unwrap();
        assert_eq!(store.get(id).unwrap().end_frame, 90);
    }

    #[test]
    fn negative_start_clamps_to_zero() {
        let mut store = SegmentStore::new();
        let id = store.add(segment(Track::MainVideo, 30, 1.0)).unwrap();
        store.update(id, SegmentPatch::move_to(-20)).unwrap();
        assert_eq!(store.get(id).unwrap().start_frame, 0);
    }

    #[test]
    fn update_missing_segment_is_not_found() {
        let mut store = SegmentStore::new();
        assert_matches!(
            store.update(SegmentId::new(), SegmentPatch::move_to(0)),
            Err(Error::NotFound { .. })
        );
    }

    #[test]
    fn self_link_rejected() {
        let mut store = SegmentStore::new();
        let id = store.add(segment(Track::Audio, 0, 1.0)).unwrap();
        assert_matches!(store.link(id, id), Err(Error::Validation(_)));
    }

    #[test]
    fn moving_target_drags_linked_segment() {
        let mut store = SegmentStore::new();
        let video = store.add(segment(Track::MainVideo, 30, 4.0)).unwrap();
        let audio = store.add(segment(Track::Audio, 30, 4.0)).unwrap();
        store.link(audio, video).unwrap();

        store.update(video, SegmentPatch::move_to(90)).unwrap();
        let a = store.get(audio).unwrap();
        assert_eq!((a.start_frame, a.end_frame), (90, 210));
    }

    #[test]
    fn moving_dependent_leaves_target_alone() {
        let mut store = SegmentStore::new();
        let video = store.add(segment(Track::MainVideo, 30, 4.0)).unwrap();
        let audio = store.add(segment(Track::Audio, 30, 4.0)).unwrap();
        store.link(audio, video).unwrap();

        store.update(audio, SegmentPatch::move_to(0)).unwrap();
        assert_eq!(store.get(video).unwrap().start_frame, 30);
    }

    #[test]
    fn cascade_follows_direct_links_only() {
        let mut store = SegmentStore::new();
        let a = store.add(segment(Track::MainVideo, 0, 1.0)).unwrap();
        let b = store.add(segment(Track::Audio, 0, 1.0)).unwrap();
        let c = store.add(segment(Track::Overlay, 0, 1.0)).unwrap();
        store.link(b, a).unwrap();
        store.link(c, b).unwrap();

        store.update(a, SegmentPatch::move_to(10)).unwrap();
        assert_eq!(store.get(b).unwrap().start_frame, 10);
        assert_eq!(store.get(c).unwrap().start_frame, 0);
    }

    #[test]
    fn cascade_stops_where_a_follower_reaches_zero() {
        let mut store = SegmentStore::new();
        let video = store.add(segment(Track::MainVideo, 30, 4.0)).unwrap();
        let audio = store.add(segment(Track::Audio, 30, 4.0)).unwrap();
        store.link(audio, video).unwrap();

        store.update(audio, SegmentPatch::move_to(0)).unwrap();
        store.update(video, SegmentPatch::move_to(0)).unwrap();

        assert_eq!(store.get(video).unwrap().start_frame, 30);
        assert_eq!(store.get(audio).unwrap().start_frame, 0);
        assert!(store.segments().iter().all(|s| s.start_frame >= 0 && s.is_consistent()));
    }

    #[test]
    fn cascade_moves_as_far_as_the_earliest_follower_allows() {
        let mut store = SegmentStore::new();
        let video = store.add(segment(Track::MainVideo, 30, 2.0)).unwrap();
        let near = store.add(segment(Track::Audio, 10, 2.0)).unwrap();
        let far = store.add(segment(Track::Overlay, 50, 1.0)).unwrap();
        store.link(near, video).unwrap();
        store.link(far, video).unwrap();

        store.update(video, SegmentPatch::move_to(0)).unwrap();

        let starts: Vec<i64> = [video, near, far]
            .iter()
            .map(|id| store.get(*id).unwrap().start_frame)
            .collect();
        assert_eq!(starts, vec![20, 0, 40]);
        assert_eq!(store.get(near).unwrap().end_frame, 60);
    }

    #[test]
    fn oversized_duration_rejected_without_panicking() {
        let mut store = SegmentStore::new();
        assert_matches!(
            store.add(segment(Track::MainVideo, 30, 1e300)),
            Err(Error::Validation(ref m)) if m.contains("limit")
        );
        let id = store.add(segment(Track::MainVideo, 30, 1.0)).unwrap();
        assert_matches!(
            store.update(id, SegmentPatch::resize(MAX_SEGMENT_SECS * 2.0)),
            Err(Error::Validation(_))
        );
        assert_eq!(store.get(id).unwrap().end_frame, 60);

        let epic = asset(MediaKind::Video, f64::MAX);
        assert_matches!(
            store.place_asset(&epic, Track::MainVideo, 0.0, 5.0),
            Err(Error::Validation(_))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn day_long_segment_is_accepted() {
        let mut store = SegmentStore::new();
        let id = store.add(segment(Track::Audio, 0, MAX_SEGMENT_SECS)).unwrap();
        assert_eq!(store.get(id).unwrap().end_frame, 2_592_000);
    }

    #[test]
    fn mixed_edits_keep_every_segment_consistent() {
        let mut store = SegmentStore::new();
        let clip = asset(MediaKind::Video, 4.0);
        let first = store.place_asset(&clip, Track::MainVideo, 1.0, 5.0).unwrap();
        let second = store.place_asset(&clip, Track::MainVideo, 5.0, 5.0).unwrap();
        let logo = Asset::new(MediaKind::Image, "/media/logo.png", "logo");
        let badge = store.place_asset(&logo, Track::Overlay, 0.5, 3.0).unwrap().primary;
        let first_audio = first.linked_audio.unwrap();
        let second_audio = second.linked_audio.unwrap();

        let check = |store: &SegmentStore, step: &str| {
            for s in store.segments() {
                assert!(s.is_consistent(), "after {step}: {s:?}");
                assert!(s.start_frame >= 0, "after {step}: {s:?}");
            }
        };

        store.update(first.primary, SegmentPatch::move_to(90)).unwrap();
        check(&store, "move");
        store.update(first.primary, SegmentPatch::resize(2.5)).unwrap();
        check(&store, "resize");
        store.update(first_audio, SegmentPatch::resize(0.7)).unwrap();
        check(&store, "follower resize");
        store.link(badge, second.primary).unwrap();
        check(&store, "link");
        store.update(second.primary, SegmentPatch::move_to(-40)).unwrap();
        check(&store, "move past zero");
        store.unlink(second.primary).unwrap();
        check(&store, "unlink");
        store.update(second_audio, SegmentPatch::move_to(3)).unwrap();
        check(&store, "move unlinked audio");
        store.update(badge, SegmentPatch::resize(1.0 / 7.0)).unwrap();
        check(&store, "fractional resize");
        store.link(first_audio, second.primary).unwrap();
        store.update(second.primary, SegmentPatch::move_to(12)).unwrap();
        check(&store, "relink and move");
        store.remove(first.primary).unwrap();
        check(&store, "remove");

        assert_eq!(store.get(first_audio).unwrap().linked_segment_id, Some(second.primary));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn remove_clears_links_to_removed() {
        let mut store = SegmentStore::new();
        let video = store.add(segment(Track::MainVideo, 0, 1.0)).unwrap();
        let audio = store.add(segment(Track::Audio, 0, 1.0)).unwrap();
        store.link(audio, video).unwrap();

        let removed = store.remove(video).unwrap();
        assert_eq!(removed.id, video);
        assert_eq!(store.get(audio).unwrap().linked_segment_id, None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unlink_clears_both_sides() {
        let mut store = SegmentStore::new();
        let video = store.add(segment(Track::MainVideo, 0, 1.0)).unwrap();
        let audio = store.add(segment(Track::Audio, 0, 1.0)).unwrap();
        store.link(audio, video).unwrap();
        store.link(video, audio).unwrap();

        store.unlink(video).unwrap();
        assert_eq!(store.get(video).unwrap().linked_segment_id, None);
        assert_eq!(store.get(audio).unwrap().linked_segment_id, None);
    }

    #[test]
    fn unlink_from_target_side() {
        let mut store = SegmentStore::new();
        let video = store.add(segment(Track::MainVideo, 0, 1.0)).unwrap();
        let audio = store.add(segment(Track::Audio, 0, 1.0)).unwrap();
        store.link(audio, video).unwrap();

        store.unlink(video).unwrap();
        assert_eq!(store.get(audio).unwrap().linked_segment_id, None);
        // After unlinking, moving the video no longer drags the audio.
        store.update(video, SegmentPatch::move_to(60)).unwrap();
        assert_eq!(store.get(audio).unwrap().start_frame, 0);
    }

    #[test]
    fn counterpart_lookup_both_directions() {
        let mut store = SegmentStore::new();
        let video = store.add(segment(Track::MainVideo, 0, 1.0)).unwrap();
        let audio = store.add(segment(Track::Audio, 0, 1.0)).unwrap();
        store.link(audio, video).unwrap();

        assert_eq!(store.linked_counterpart(audio).unwrap().id, video);
        assert_eq!(store.linked_counterpart(video).unwrap().id, audio);
    }

    #[test]
    fn dangling_link_reads_as_unlinked() {
        let mut seg = segment(Track::Audio, 0, 1.0);
        seg.linked_segment_id = Some(SegmentId::new());
        let id = seg.id;
        let store = SegmentStore { segments: vec![seg] };
        assert!(store.linked_counterpart(id).is_none());
    }

    #[test]
    fn from_segments_repairs_state() {
        let mut broken = segment(Track::MainVideo, 0, 2.0);
        broken.end_frame = 999;
        broken.linked_segment_id = Some(SegmentId::new());
        let store = SegmentStore::from_segments(vec![broken]);
        let seg = &store.segments()[0];
        assert_eq!(seg.end_frame, 60);
        assert!(seg.linked_segment_id.is_none());
    }

    #[test]
    fn video_drop_on_main_creates_linked_audio() {
        let mut store = SegmentStore::new();
        let clip = asset(MediaKind::Video, 4.0);
        let placed = store.place_asset(&clip, Track::MainVideo, 2.0, 5.0).unwrap();

        let audio_id = placed.linked_audio.unwrap();
        let audio = store.get(audio_id).unwrap();
        assert_eq!(audio.track, Track::Audio);
        assert_eq!(audio.linked_segment_id, Some(placed.primary));
        assert_eq!((audio.start_frame, audio.end_frame), (60, 180));
        assert_eq!(audio.location, clip.location);
    }

    #[test]
    fn image_drop_uses_default_still_duration() {
        let mut store = SegmentStore::new();
        let still = Asset::new(MediaKind::Image, "/media/still.png", "still");
        let placed = store.place_asset(&still, Track::MainVideo, 0.0, 5.0).unwrap();
        assert!(placed.linked_audio.is_none());
        assert_eq!(store.get(placed.primary).unwrap().end_frame, 150);
    }

    #[test]
    fn audio_asset_lands_on_audio_track() {
        let mut store = SegmentStore::new();
        let music = asset(MediaKind::Audio, 10.0);
        let placed = store.place_asset(&music, Track::MainVideo, 0.0, 5.0).unwrap();
        assert_eq!(store.get(placed.primary).unwrap().track, Track::Audio);
    }

    #[test]
    fn image_on_audio_track_rejected() {
        let mut store = SegmentStore::new();
        let still = Asset::new(MediaKind::Image, "/media/still.png", "still");
        assert_matches!(
            store.place_asset(&still, Track::Audio, 0.0, 5.0),
            Err(Error::Validation(_))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn overlay_reposition() {
        let mut store = SegmentStore::new();
        let logo = Asset::new(MediaKind::Image, "/media/logo.png", "logo");
        let placed = store.place_asset(&logo, Track::Overlay, 1.0, 3.0).unwrap();
        store.update(placed.primary, SegmentPatch::place(0.9, 0.1)).unwrap();
        assert_eq!(
            store.get(placed.primary).unwrap().placement,
            Some(OverlayPlacement { x: 0.9, y: 0.1 })
        );
    }

    #[test]
    fn end_frame_of_program() {
        let mut store = SegmentStore::new();
        assert_eq!(store.end_frame(), 0);
        store.add(segment(Track::MainVideo, 0, 4.0)).unwrap();
        store.add(segment(Track::Audio, 60, 4.0)).unwrap();
        assert_eq!(store.end_frame(), 180);
    }
}
