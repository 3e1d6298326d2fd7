//! Running ffmpeg-family executables from async code.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

use sr_core::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Captured result of a finished process. Text is decoded lossily.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    /// ffmpeg logs here, so this is what ends up in export logs.
    pub stderr: String,
}

impl ToolOutput {
    /// `-1` if the process died from a signal.
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Builder for one invocation of an external tool.
///
/// ```no_run
/// # async fn formats() -> sr_core::Result<()> {
/// let out = sr_engine::ToolCommand::new("ffprobe".into())
///     .args(["-v", "error", "-show_format", "clip.mp4"])
///     .execute()
///     .await?;
/// print!("{}", out.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    workdir: Option<PathBuf>,
    deadline: Duration,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            workdir: None,
            deadline: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, value: impl Into<String>) -> &mut Self {
        self.args.push(value.into());
        self
    }

    pub fn args(&mut self, values: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        for v in values {
            self.args.push(v.into());
        }
        self
    }

    /// The process is killed once this much time has passed.
    pub fn timeout(&mut self, limit: Duration) -> &mut Self {
        self.deadline = limit;
        self
    }

    /// Working directory; bare file names in the arguments resolve here.
    pub fn current_dir(&mut self, dir: &Path) -> &mut Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Short name for error messages, e.g. `ffmpeg` for `/usr/bin/ffmpeg`.
    fn label(&self) -> String {
        let name = self.program.file_name().unwrap_or(self.program.as_os_str());
        name.to_string_lossy().into_owned()
    }

    /// Waits for the process and returns what it printed. A non-zero exit
    /// still yields `Ok`; only spawn failures and the deadline are errors.
    pub async fn output(&self) -> sr_core::Result<ToolOutput> {
        let label = self.label();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        tracing::trace!(tool = %label, args = ?self.args, "spawn");
        let child = cmd
            .spawn()
            .map_err(|e| Error::tool(&label, format!("could not start: {e}")))?;

        // On timeout the wait future is dropped, which kills the child.
        let waited = tokio::time::timeout(self.deadline, child.wait_with_output())
            .await
            .map_err(|_| Error::tool(&label, format!("timed out after {:?}", self.deadline)))?;
        let raw = waited.map_err(|e| Error::tool(&label, format!("wait failed: {e}")))?;

        Ok(ToolOutput {
            status: raw.status,
            stdout: String::from_utf8_lossy(&raw.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&raw.stderr).into_owned(),
        })
    }

    /// [`output`](Self::output), plus an error carrying stderr when the
    /// exit status is non-zero.
    pub async fn execute(&self) -> sr_core::Result<ToolOutput> {
        let out = self.output().await?;
        if out.status.success() {
            return Ok(out);
        }
        Err(Error::tool(
            self.label(),
            format!("exited with status {}: {}", out.status, out.stderr.trim()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn have(tool: &str) -> bool {
        which::which(tool).is_ok()
    }

    #[tokio::test]
    async fn captures_stdout() {
        if !have("echo") {
            return;
        }
        let out = ToolCommand::new("echo".into())
            .args(["hello", "reel"])
            .execute()
            .await
            .unwrap();
        assert_eq!(out.exit_code(), 0);
        assert_eq!(out.stdout.trim(), "hello reel");
    }

    #[tokio::test]
    async fn failing_exit_is_ok_for_output_but_not_execute() {
        if !have("false") {
            return;
        }
        let cmd = ToolCommand::new("false".into());
        let out = cmd.output().await.unwrap();
        assert_ne!(out.exit_code(), 0);

        let err = cmd.execute().await.unwrap_err();
        assert!(matches!(err, Error::Tool { ref tool, .. } if tool == "false"));
        assert!(err.to_string().contains("exited with status"));
    }

    #[tokio::test]
    async fn runs_in_the_requested_directory() {
        if !have("pwd") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let out = ToolCommand::new("pwd".into())
            .current_dir(dir.path())
            .execute()
            .await
            .unwrap();
        assert_eq!(
            Path::new(out.stdout.trim()).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_program_cannot_start() {
        let err = ToolCommand::new("/no/such/ffmpeg".into())
            .output()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("could not start"), "{err}");
    }

    #[tokio::test]
    async fn slow_process_hits_the_deadline() {
        if !have("sleep") {
            return;
        }
        let err = ToolCommand::new("sleep".into())
            .arg("5")
            .timeout(Duration::from_millis(50))
            .output()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }
}
