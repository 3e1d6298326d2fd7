//! # sr-engine
//!
//! The transcoding engine the render pipeline drives.
//!
//! - **[`TranscodeEngine`]** -- load / write_file / exec / read_file /
//!   delete_file over the engine's own flat storage.
//! - **[`FfmpegEngine`]** -- the ffmpeg CLI behind that interface, with a
//!   temporary directory as storage.
//! - **[`EngineHandle`]** -- the process-wide instance: loaded once on first
//!   use, one session at a time.
//! - **[`ToolRegistry`]** / **[`ToolCommand`]** -- tool discovery and async
//!   process execution with a deadline.
//! - **[`args`]** -- the argument vectors and filter graphs the stages send.

pub mod args;
pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod handle;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use engine::{validate_file_name, ExecOutput, TranscodeEngine};
pub use ffmpeg::FfmpegEngine;
pub use handle::{EngineHandle, EngineSession};
pub use tools::{ToolInfo, ToolRegistry};
