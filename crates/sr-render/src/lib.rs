//! # sr-render
//!
//! Export of a timeline snapshot to a single MP4 through the transcoding
//! engine.
//!
//! [`RenderPipeline::render`] runs four [`Stage`]s strictly in sequence:
//!
//! 1. **normalize** -- each main-track segment, in start order, becomes a
//!    1280x720 30 fps video-only clip. A clip that fails is skipped.
//! 2. **concat** -- the clips are joined by stream copy. No clips at all is
//!    fatal.
//! 3. **mix** -- audio segments are delayed to their start and summed under
//!    the video. Any failure falls back to the silent video.
//! 4. **package** -- the file is read back out of the engine.
//!
//! Progress goes through a [`ProgressReporter`]; everything that was dropped
//! along the way is in the returned [`RenderLog`].

pub mod context;
pub mod fetch;
pub mod pipeline;
pub mod progress;
pub mod stage;
pub mod stages;

pub use context::RenderContext;
pub use fetch::{decode_data_uri, LocationFetcher, SourceFetcher};
pub use pipeline::{RenderOutput, RenderPipeline, RenderRequest};
pub use progress::{LogEntry, LogLevel, ProgressReporter, RenderLog};
pub use stage::Stage;
