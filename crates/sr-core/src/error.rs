//! The error type shared by every storyreel crate.
//!
//! Clip-level render problems are not errors: the stage that hits them logs
//! a line and carries on. Only failures that stop an operation end up here.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Bad input: an unparsable file, a non-positive duration, and so on.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Refused because an export is in flight.
    #[error("busy: {0}")]
    Conflict(String),

    #[error("i/o failure: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// ffmpeg or ffprobe failed to run or exited non-zero.
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("could not fetch {location}: {message}")]
    Fetch { location: String, message: String },

    /// The operation has nothing to work with, e.g. an export of a timeline
    /// with no main video.
    #[error("cannot start: {0}")]
    Precondition(String),

    #[error("{stage} stage failed: {message}")]
    Render { stage: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Process exit status the CLI reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Internal(_) => 1,
            Error::Validation(_) => 2,
            Error::NotFound { .. } => 3,
            Error::Conflict(_) => 4,
            Error::Io { .. } => 5,
            Error::Tool { .. } => 6,
            Error::Fetch { .. } => 7,
            Error::Precondition(_) => 8,
            Error::Render { .. } => 9,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn fetch(location: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Fetch {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn render(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Render {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
