//! [`TranscodeEngine`] backed by the ffmpeg CLI.
//!
//! The engine's storage is a private temporary directory; `exec` runs ffmpeg
//! with that directory as its working directory so every file name in the
//! argument vector resolves inside it.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;

use sr_core::config::Config;

use crate::command::ToolCommand;
use crate::engine::{validate_file_name, ExecOutput, TranscodeEngine};
use crate::tools::ToolRegistry;

/// Flags prepended to every exec: quiet banner, never prompt, overwrite.
const BASE_FLAGS: &[&str] = &["-hide_banner", "-nostdin", "-y"];

pub struct FfmpegEngine {
    tools: ToolRegistry,
    timeout: Duration,
    ffmpeg: Option<PathBuf>,
    storage: Option<TempDir>,
}

impl FfmpegEngine {
    pub fn new(tools: ToolRegistry, timeout: Duration) -> Self {
        Self {
            tools,
            timeout,
            ffmpeg: None,
            storage: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ToolRegistry::discover(&config.tools),
            Duration::from_secs(config.render.exec_timeout_secs),
        )
    }

    fn path_of(&self, name: &str) -> sr_core::Result<PathBuf> {
        validate_file_name(name)?;
        let dir = self
            .storage
            .as_ref()
            .ok_or_else(|| sr_core::Error::Precondition("engine used before load()".into()))?;
        Ok(dir.path().join(name))
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn load(&mut self) -> sr_core::Result<()> {
        if self.storage.is_some() {
            return Ok(());
        }
        let ffmpeg = self.tools.require("ffmpeg")?.to_path_buf();
        let storage = tempfile::Builder::new()
            .prefix("storyreel-engine-")
            .tempdir()?;
        tracing::info!(
            "engine loaded: {} (storage {})",
            ffmpeg.display(),
            storage.path().display()
        );
        self.ffmpeg = Some(ffmpeg);
        self.storage = Some(storage);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.storage.is_some()
    }

    async fn write_file(&mut self, name: &str, data: Bytes) -> sr_core::Result<()> {
        let path = self.path_of(name)?;
        tracing::trace!("engine: write {name} ({} bytes)", data.len());
        tokio::fs::write(path, &data).await?;
        Ok(())
    }

    async fn exec(&mut self, args: &[String]) -> sr_core::Result<ExecOutput> {
        let (Some(ffmpeg), Some(storage)) = (self.ffmpeg.as_ref(), self.storage.as_ref()) else {
            return Err(sr_core::Error::Precondition("engine used before load()".into()));
        };
        tracing::debug!("engine: ffmpeg {}", args.join(" "));
        let out = ToolCommand::new(ffmpeg.clone())
            .args(BASE_FLAGS.iter().copied())
            .args(args.iter().cloned())
            .current_dir(storage.path())
            .timeout(self.timeout)
            .output()
            .await?;
        Ok(ExecOutput {
            exit_code: out.exit_code(),
            log: out.stderr,
        })
    }

    async fn read_file(&mut self, name: &str) -> sr_core::Result<Bytes> {
        let path = self.path_of(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(sr_core::Error::not_found("engine file", name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&mut self, name: &str) -> sr_core::Result<()> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(sr_core::Error::not_found("engine file", name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_files(&self) -> sr_core::Result<Vec<String>> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(Vec::new());
        };
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(storage.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }
}
