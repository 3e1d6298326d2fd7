//! Shared test harness for integration tests.
//!
//! Provides an in-memory [`FakeEngine`] that records every command and
//! simulates its output, a [`FakeFetcher`] serving canned bytes, and
//! [`TestHarness`] which wires both into a [`Studio`].

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use storyreel::core::config::Config;
use storyreel::core::{Error, Result};
use storyreel::engine::args::parse_concat_list;
use storyreel::engine::{validate_file_name, EngineHandle, ExecOutput, TranscodeEngine};
use storyreel::render::SourceFetcher;
use storyreel::Studio;

// ---------------------------------------------------------------------------
// FakeEngine
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct EngineState {
    pub loads: usize,
    pub files: BTreeMap<String, Bytes>,
    /// Every argument vector passed to `exec`, in order.
    pub calls: Vec<Vec<String>>,
    /// Names written, in order.
    pub writes: Vec<String>,
    /// A command containing any of these substrings exits non-zero.
    pub fail_on: Vec<String>,
}

/// In-memory engine. Each command's output file (its last argument) gets
/// content derived from its inputs so tests can trace what ended up where:
/// plain commands copy their first input, concat joins the listed clips with
/// `|`, and a mix appends `+mix(n)` for `n` audio inputs.
#[derive(Clone, Default)]
pub struct FakeEngine {
    pub state: Arc<Mutex<EngineState>>,
    loaded: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make commands containing `pattern` fail.
    pub fn fail_on(self, pattern: &str) -> Self {
        self.state.lock().fail_on.push(pattern.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().calls.clone()
    }

    pub fn files(&self) -> Vec<String> {
        self.state.lock().files.keys().cloned().collect()
    }

    fn simulate(state: &mut EngineState, args: &[String]) -> ExecOutput {
        if let Some(pattern) = state
            .fail_on
            .iter()
            .find(|p| args.iter().any(|a| a.contains(p.as_str())))
        {
            return ExecOutput {
                exit_code: 1,
                log: format!("frame=0\nsimulated failure on '{pattern}'"),
            };
        }

        let inputs: Vec<&String> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| &w[1])
            .collect();
        let Some(output) = args.last() else {
            return ExecOutput {
                exit_code: 1,
                log: "no output file".into(),
            };
        };
        for input in &inputs {
            if !state.files.contains_key(input.as_str()) {
                return ExecOutput {
                    exit_code: 1,
                    log: format!("{input}: No such file or directory"),
                };
            }
        }

        let content = if args.iter().any(|a| a == "concat") {
            let list = String::from_utf8_lossy(&state.files[inputs[0].as_str()]).to_string();
            let mut parts = Vec::new();
            for clip in parse_concat_list(&list) {
                match state.files.get(&clip) {
                    Some(b) => parts.push(String::from_utf8_lossy(b).to_string()),
                    None => {
                        return ExecOutput {
                            exit_code: 1,
                            log: format!("{clip}: No such file or directory"),
                        }
                    }
                }
            }
            parts.join("|")
        } else if args.iter().any(|a| a == "-filter_complex") {
            let video = String::from_utf8_lossy(&state.files[inputs[0].as_str()]).to_string();
            format!("{video}+mix({})", inputs.len() - 1)
        } else {
            match inputs.first() {
                Some(i) => String::from_utf8_lossy(&state.files[i.as_str()]).to_string(),
                None => String::new(),
            }
        };
        // `-f null -` decodes without writing anything.
        if output != "-" {
            state.files.insert(output.clone(), Bytes::from(content));
        }
        ExecOutput {
            exit_code: 0,
            log: String::new(),
        }
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn load(&mut self) -> Result<()> {
        self.state.lock().loads += 1;
        self.loaded = true;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    async fn write_file(&mut self, name: &str, data: Bytes) -> Result<()> {
        validate_file_name(name)?;
        let mut state = self.state.lock();
        state.writes.push(name.to_string());
        state.files.insert(name.to_string(), data);
        Ok(())
    }

    async fn exec(&mut self, args: &[String]) -> Result<ExecOutput> {
        let mut state = self.state.lock();
        state.calls.push(args.to_vec());
        Ok(Self::simulate(&mut state, args))
    }

    async fn read_file(&mut self, name: &str) -> Result<Bytes> {
        self.state
            .lock()
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("engine file", name))
    }

    async fn delete_file(&mut self, name: &str) -> Result<()> {
        match self.state.lock().files.remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::not_found("engine file", name)),
        }
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().files.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// FakeFetcher
// ---------------------------------------------------------------------------

/// Serves bytes from a map; unknown locations fail like a 404.
#[derive(Default)]
pub struct FakeFetcher {
    sources: HashMap<String, Bytes>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, content: &str) -> Self {
        self.sources
            .insert(location.to_string(), Bytes::from(content.to_string()));
        self
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, location: &str) -> Result<Bytes> {
        self.requests.lock().push(location.to_string());
        self.sources
            .get(location)
            .cloned()
            .ok_or_else(|| Error::fetch(location, "HTTP status client error (404 Not Found)"))
    }
}

// ---------------------------------------------------------------------------
// TestHarness
// ---------------------------------------------------------------------------

/// A [`Studio`] running on the fakes.
pub struct TestHarness {
    pub studio: Studio,
    pub engine: FakeEngine,
    pub fetcher: Arc<FakeFetcher>,
}

impl TestHarness {
    pub fn new(fetcher: FakeFetcher) -> Self {
        Self::with_engine(FakeEngine::new(), fetcher)
    }

    pub fn with_engine(engine: FakeEngine, fetcher: FakeFetcher) -> Self {
        let fetcher = Arc::new(fetcher);
        let studio = Studio::new(
            Config::default(),
            EngineHandle::new(engine.clone()),
            fetcher.clone(),
        );
        Self {
            studio,
            engine,
            fetcher,
        }
    }

    /// Commands that were sent to the engine, joined into single strings.
    pub fn command_lines(&self) -> Vec<String> {
        self.engine.calls().iter().map(|c| c.join(" ")).collect()
    }
}
