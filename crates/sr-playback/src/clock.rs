//! The transport clock: one logical playback time for the whole studio.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sr_core::AssetId;

/// What the preview area is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "asset_id", rename_all = "snake_case")]
pub enum PlaybackMode {
    /// A single library asset, outside of the timeline.
    AssetPreview(AssetId),
    /// The composed program.
    TimelinePlayback,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssetPreview(id) => write!(f, "asset_preview({})", id.short()),
            Self::TimelinePlayback => write!(f, "timeline_playback"),
        }
    }
}

/// A copy of the clock's state at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub mode: PlaybackMode,
    pub playing: bool,
    /// Program time in seconds.
    pub time: f64,
    /// Program length in seconds.
    pub duration: f64,
}

/// Play/pause/seek state plus the preview/timeline mode switch.
///
/// Entering a mode that is already active changes nothing.
#[derive(Debug, Clone)]
pub struct TransportClock {
    state: TransportState,
}

impl Default for TransportClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClock {
    pub fn new() -> Self {
        Self {
            state: TransportState {
                mode: PlaybackMode::TimelinePlayback,
                playing: false,
                time: 0.0,
                duration: 0.0,
            },
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn mode(&self) -> PlaybackMode {
        self.state.mode
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn time(&self) -> f64 {
        self.state.time
    }

    /// Update the program length; the playhead is pulled back inside it.
    pub fn set_duration(&mut self, secs: f64) {
        self.state.duration = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        if self.state.time > self.state.duration {
            self.state.time = self.state.duration;
        }
    }

    /// Switch to timeline playback. Returns whether the mode changed.
    pub fn enter_timeline(&mut self) -> bool {
        if self.state.mode == PlaybackMode::TimelinePlayback {
            return false;
        }
        self.state.mode = PlaybackMode::TimelinePlayback;
        true
    }

    /// Show one asset instead of the program. Playback stops. Returns whether
    /// the mode changed.
    pub fn preview_asset(&mut self, asset: AssetId) -> bool {
        let target = PlaybackMode::AssetPreview(asset);
        self.state.playing = false;
        if self.state.mode == target {
            return false;
        }
        self.state.mode = target;
        true
    }

    /// Play the program. At the end, playback restarts from zero.
    pub fn play(&mut self) {
        self.enter_timeline();
        if self.state.time >= self.state.duration {
            self.state.time = 0.0;
        }
        self.state.playing = true;
    }

    pub fn pause(&mut self) {
        self.state.playing = false;
    }

    pub fn toggle(&mut self) {
        if self.state.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead, clamped to the program.
    pub fn seek(&mut self, secs: f64) {
        self.enter_timeline();
        let secs = if secs.is_finite() { secs } else { 0.0 };
        self.state.time = secs.clamp(0.0, self.state.duration);
    }

    /// Advance by `dt` when playing. Playback pauses at the end of the
    /// program. Returns whether the time moved.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.state.playing || self.state.mode != PlaybackMode::TimelinePlayback {
            return false;
        }
        let next = self.state.time + dt.as_secs_f64();
        if next >= self.state.duration {
            self.state.time = self.state.duration;
            self.state.playing = false;
        } else {
            self.state.time = next;
        }
        true
    }
}

/// A running tick loop. Dropping the handle stops it.
pub struct TickerHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl TickerHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                tracing::warn!("tick loop ended abnormally: {e}");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Drive `clock` at `tick_hz`, calling `on_tick` with the new state each
/// tick. Time advances by the real elapsed time, so a late tick catches up
/// instead of slowing the program down.
pub fn spawn_ticker<F>(clock: Arc<Mutex<TransportClock>>, tick_hz: u32, mut on_tick: F) -> TickerHandle
where
    F: FnMut(TransportState) + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let period = Duration::from_secs_f64(1.0 / f64::from(tick_hz.max(1)));

    let join = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last = Instant::now();
        tracing::debug!("tick loop started at {tick_hz} Hz");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let now = Instant::now();
                    let state = {
                        let mut clock = clock.lock();
                        clock.advance(now - last);
                        clock.state()
                    };
                    last = now;
                    on_tick(state);
                }
            }
        }
        tracing::debug!("tick loop stopped");
    });

    TickerHandle {
        cancel,
        join: Some(join),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(duration: f64) -> TransportClock {
        let mut c = TransportClock::new();
        c.set_duration(duration);
        c
    }

    #[test]
    fn advance_only_while_playing() {
        let mut c = clock(10.0);
        assert!(!c.advance(Duration::from_millis(500)));
        c.play();
        assert!(c.advance(Duration::from_millis(500)));
        assert!((c.time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn pauses_at_end_and_restarts_on_play() {
        let mut c = clock(1.0);
        c.play();
        c.advance(Duration::from_secs(2));
        assert_eq!(c.time(), 1.0);
        assert!(!c.is_playing());
        c.play();
        assert_eq!(c.time(), 0.0);
    }

    #[test]
    fn seek_clamps_and_enters_timeline() {
        let mut c = clock(5.0);
        c.preview_asset(AssetId::new());
        c.seek(9.0);
        assert_eq!(c.mode(), PlaybackMode::TimelinePlayback);
        assert_eq!(c.time(), 5.0);
        c.seek(-1.0);
        assert_eq!(c.time(), 0.0);
    }

    #[test]
    fn preview_stops_playback_and_is_idempotent() {
        let mut c = clock(5.0);
        let id = AssetId::new();
        c.play();
        assert!(c.preview_asset(id));
        assert!(!c.is_playing());
        assert!(!c.preview_asset(id));
        // Preview mode never advances.
        assert!(!c.advance(Duration::from_secs(1)));
        assert!(c.enter_timeline());
        assert!(!c.enter_timeline());
    }

    #[test]
    fn shrinking_duration_pulls_playhead_back() {
        let mut c = clock(10.0);
        c.seek(8.0);
        c.set_duration(4.0);
        assert_eq!(c.time(), 4.0);
    }

    #[test]
    fn mode_display() {
        assert_eq!(PlaybackMode::TimelinePlayback.to_string(), "timeline_playback");
    }

    #[tokio::test]
    async fn ticker_advances_and_stops() {
        let shared = Arc::new(Mutex::new(clock(60.0)));
        shared.lock().play();
        let ticks = Arc::new(Mutex::new(0usize));
        let counter = ticks.clone();

        let handle = spawn_ticker(shared.clone(), 60, move |_| *counter.lock() += 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop().await;

        let seen = *ticks.lock();
        assert!(seen >= 3, "only {seen} ticks");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*ticks.lock(), seen, "ticked after stop");
    }

    #[tokio::test]
    async fn dropping_handle_cancels() {
        let shared = Arc::new(Mutex::new(clock(60.0)));
        let handle = spawn_ticker(shared, 30, |_| {});
        let token = handle.cancel.clone();
        drop(handle);
        assert!(token.is_cancelled());
    }
}
