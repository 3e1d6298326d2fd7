//! Storyreel - timeline editing, preview playback and MP4 export
//!
//! This library crate exposes the [`Studio`] for the CLI and for
//! integration testing. The building blocks live in the `sr-*` crates and
//! are re-exported here.

pub mod studio;

pub use studio::{ExportStatus, Studio};

pub use sr_core as core;
pub use sr_engine as engine;
pub use sr_playback as playback;
pub use sr_render as render;
pub use sr_timeline as timeline;
