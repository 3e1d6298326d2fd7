//! The [`TranscodeEngine`] trait: a command-style media processor with a
//! private flat filesystem.
//!
//! The engine is addressed purely by file names inside its own storage.
//! Callers write inputs, run an ffmpeg-grammar argument vector, read the
//! output back and delete what they wrote. The storage is shared by every
//! caller of an engine instance, so all access goes through
//! [`EngineHandle`](crate::EngineHandle).

use async_trait::async_trait;
use bytes::Bytes;

/// What an `exec` call left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Process exit code; zero means success.
    pub exit_code: i32,
    /// The engine's log output.
    pub log: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The last non-empty log line, which for ffmpeg is usually the error.
    pub fn last_log_line(&self) -> &str {
        self.log
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// One-time initialization. Must complete before any other call.
    async fn load(&mut self) -> sr_core::Result<()>;

    fn is_loaded(&self) -> bool;

    async fn write_file(&mut self, name: &str, data: Bytes) -> sr_core::Result<()>;

    /// Run one command. A non-zero exit is reported in the output, not as an
    /// error; errors mean the engine itself could not run.
    async fn exec(&mut self, args: &[String]) -> sr_core::Result<ExecOutput>;

    async fn read_file(&mut self, name: &str) -> sr_core::Result<Bytes>;

    async fn delete_file(&mut self, name: &str) -> sr_core::Result<()>;

    /// Names currently stored, sorted.
    async fn list_files(&self) -> sr_core::Result<Vec<String>>;
}

/// Reject names that could escape the engine's storage.
pub fn validate_file_name(name: &str) -> sr_core::Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.starts_with('-');
    if bad {
        return Err(sr_core::Error::Validation(format!(
            "invalid engine file name '{name}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_log_line_skips_blank_tail() {
        let out = ExecOutput {
            exit_code: 1,
            log: "frame=1\nin.png: Invalid data found\n\n  \n".into(),
        };
        assert!(!out.success());
        assert_eq!(out.last_log_line(), "in.png: Invalid data found");
        assert_eq!(ExecOutput::default().last_log_line(), "");
    }

    #[test]
    fn file_names_are_flat() {
        assert!(validate_file_name("exp_0_in.png").is_ok());
        assert!(validate_file_name("list.txt").is_ok());
        for bad in ["", "..", "../etc/passwd", "a/b", "-i", "a\\b"] {
            assert!(validate_file_name(bad).is_err(), "{bad:?} accepted");
        }
    }
}
