//! Locating ffmpeg and ffprobe on this machine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sr_core::config::ToolsConfig;

const KNOWN_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

/// One row of the `check-tools` report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Prefers configured paths that exist, then `PATH`. Tools found
    /// nowhere are simply absent from the registry.
    pub fn discover(config: &ToolsConfig) -> Self {
        let overrides = [
            config.ffmpeg_path.as_deref(),
            config.ffprobe_path.as_deref(),
        ];
        let tools = KNOWN_TOOLS
            .iter()
            .zip(overrides)
            .filter_map(|(&name, configured)| {
                locate(name, configured).map(|path| (name.to_string(), path))
            })
            .collect();
        Self { tools }
    }

    pub fn with_paths(paths: impl IntoIterator<Item = (String, PathBuf)>) -> Self {
        Self {
            tools: paths.into_iter().collect(),
        }
    }

    pub fn require(&self, name: &str) -> sr_core::Result<&Path> {
        match self.tools.get(name) {
            Some(path) => Ok(path),
            None => Err(sr_core::Error::tool(
                name,
                format!("{name} not found; install it or set tools.{name}_path"),
            )),
        }
    }

    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| {
                let path = self.tools.get(name).cloned();
                ToolInfo {
                    name: name.to_string(),
                    available: path.is_some(),
                    version: path.as_deref().and_then(version_line),
                    path,
                }
            })
            .collect()
    }
}

fn locate(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = configured {
        if p.exists() {
            tracing::debug!(tool = name, path = %p.display(), "using configured tool");
            return Some(p.to_path_buf());
        }
        tracing::warn!(tool = name, path = %p.display(), "configured tool missing, trying PATH");
    }
    match which::which(name) {
        Ok(path) => {
            tracing::debug!(tool = name, path = %path.display(), "found tool on PATH");
            Some(path)
        }
        Err(_) => {
            tracing::debug!(tool = name, "tool not found");
            None
        }
    }
}

/// `ffmpeg version 6.1 Copyright ...` and the like.
fn version_line(path: &Path) -> Option<String> {
    let out = std::process::Command::new(path).arg("-version").output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&out.stdout);
    text.lines().next().map(str::to_owned)
}
