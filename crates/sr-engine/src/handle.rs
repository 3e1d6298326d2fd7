//! Shared ownership of the process-wide engine.
//!
//! [`EngineHandle`] is a cheap clone of one engine instance. The first
//! [`session`](EngineHandle::session) call loads the engine; concurrent first
//! callers wait on the same load. Each session holds the engine exclusively,
//! so its storage only ever has one writer.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, OnceLock};

use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};

use sr_core::config::Config;

use crate::engine::TranscodeEngine;
use crate::ffmpeg::FfmpegEngine;

static GLOBAL: OnceLock<EngineHandle> = OnceLock::new();

#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<Mutex<Box<dyn TranscodeEngine>>>,
    loaded: Arc<OnceCell<()>>,
}

impl EngineHandle {
    pub fn new(engine: impl TranscodeEngine + 'static) -> Self {
        let engine: Box<dyn TranscodeEngine> = Box::new(engine);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            loaded: Arc::new(OnceCell::new()),
        }
    }

    /// The process-wide ffmpeg engine. `config` is only read by the first
    /// caller.
    pub fn global(config: &Config) -> Self {
        GLOBAL
            .get_or_init(|| EngineHandle::new(FfmpegEngine::from_config(config)))
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Load the engine if needed and take exclusive use of it.
    ///
    /// A failed load is not remembered; the next session retries.
    pub async fn session(&self) -> sr_core::Result<EngineSession> {
        self.loaded
            .get_or_try_init(|| async {
                let mut engine = self.engine.lock().await;
                if !engine.is_loaded() {
                    engine.load().await?;
                }
                Ok::<(), sr_core::Error>(())
            })
            .await?;
        let guard = self.engine.clone().lock_owned().await;
        Ok(EngineSession { guard })
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

/// Exclusive use of the engine. Dropping it lets the next caller in.
pub struct EngineSession {
    guard: OwnedMutexGuard<Box<dyn TranscodeEngine>>,
}

impl Deref for EngineSession {
    type Target = dyn TranscodeEngine;

    fn deref(&self) -> &Self::Target {
        &**self.guard
    }
}

impl DerefMut for EngineSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut **self.guard
    }
}
