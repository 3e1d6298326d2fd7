//! Progress reporting and the diagnostic trail of one export.

use std::fmt;

use parking_lot::Mutex;

/// Highest fraction reported before the export has fully succeeded.
const MAX_BEFORE_DONE: f32 = 0.99;

/// Progress callback wrapper. Reported fractions never go backwards and only
/// [`finish`](Self::finish) reports `1.0`.
pub struct ProgressReporter {
    callback: Box<dyn Fn(f32, &str) + Send + Sync>,
    last: Mutex<f32>,
}

impl ProgressReporter {
    pub fn new(callback: impl Fn(f32, &str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            last: Mutex::new(0.0),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    /// Report `fraction` with a stage label.
    pub fn report(&self, fraction: f32, label: &str) {
        let value = {
            let mut last = self.last.lock();
            let v = if fraction.is_nan() { *last } else { fraction };
            *last = v.clamp(0.0, MAX_BEFORE_DONE).max(*last);
            *last
        };
        tracing::debug!("progress {:.0}% {label}", value * 100.0);
        (self.callback)(value, label);
    }

    /// Report `fraction` of the way through `range`.
    pub fn report_within(&self, range: (f32, f32), fraction: f32, label: &str) {
        let (lo, hi) = range;
        self.report(lo + (hi - lo) * fraction.clamp(0.0, 1.0), label);
    }

    /// Report completion.
    pub fn finish(&self, label: &str) {
        *self.last.lock() = 1.0;
        (self.callback)(1.0, label);
    }

    pub fn current(&self) -> f32 {
        *self.last.lock()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.current())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
}

/// One line of the render trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub stage: &'static str,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
        };
        write!(f, "[{}] {level}: {}", self.stage, self.message)
    }
}

/// Accumulated render log. Every skipped clip and every fallback lands here
/// so a degraded export is still diagnosable after it succeeds.
#[derive(Debug, Clone, Default)]
pub struct RenderLog {
    entries: Vec<LogEntry>,
}

impl RenderLog {
    pub fn info(&mut self, stage: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("[{stage}] {message}");
        self.entries.push(LogEntry {
            level: LogLevel::Info,
            stage,
            message,
        });
    }

    pub fn warn(&mut self, stage: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("[{stage}] {message}");
        self.entries.push(LogEntry {
            level: LogLevel::Warn,
            stage,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.level == LogLevel::Warn)
            .count()
    }

    /// Rendered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}
