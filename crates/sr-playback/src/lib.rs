//! # sr-playback
//!
//! Interactive preview of the timeline.
//!
//! - **[`TransportClock`]** -- play, pause, seek and the preview/timeline
//!   mode switch, advanced by a cancellable tick loop ([`spawn_ticker`]).
//! - **[`resolve`]** -- which segment is active on each track at a time.
//! - **[`plan_sync`]** -- the commands that keep one [`MediaSurface`] within
//!   tolerance of the clock.
//! - **[`PlaybackController`]** -- runs the above once per tick and reports a
//!   [`Composition`].

pub mod clock;
pub mod controller;
pub mod resolver;
pub mod surface;

pub use clock::{spawn_ticker, PlaybackMode, TickerHandle, TransportClock, TransportState};
pub use controller::{Composition, MainView, OverlayView, PlaybackController};
pub use resolver::{active_on, local_time, resolve, resolve_frame, time_to_frame, ActiveSegments};
pub use surface::{apply, plan_sync, MediaSurface, SurfaceCommand, SurfaceEvent, SurfaceSnapshot, SyncTarget};
