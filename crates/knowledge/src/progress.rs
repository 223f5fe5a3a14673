//! Progress reporting for dataset indexing.
//!
//! Building an index extracts every source, chunks it, embeds every chunk and
//! writes a snapshot. Each step emits [`ProgressEvent`]s through an optional
//! callback so the CLI can show where a long build is.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Step of a dataset build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discover,
    Extract,
    Chunk,
    Embed,
    Persist,
    Load,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Extract => "extract",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Persist => "persist",
            Self::Load => "load",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,

    /// Units done so far (files, chunks)
    pub current: u64,

    /// Units expected, when known
    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    /// Percentage complete, when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                100.0
            }
        })
    }

    /// Single-line rendering, e.g. `[embed] 32/64 (50%) - model=trigram-v1`.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Cheap-to-clone event sink; a reporter without a callback only logs.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, phase: Phase, current: u64, total: Option<u64>, message: impl Into<String>) {
        let event = ProgressEvent {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            elapsed_secs = event.elapsed_secs,
            "{}",
            event.message
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn discover(&self, found: u64, dataset: &str) {
        self.emit(Phase::Discover, found, None, format!("dataset {}", dataset));
    }

    pub fn extract(&self, current: u64, total: u64, file: &str) {
        self.emit(Phase::Extract, current, Some(total), format!("reading {}", file));
    }

    pub fn chunk(&self, documents: u64, chunks: usize) {
        self.emit(
            Phase::Chunk,
            documents,
            Some(documents),
            format!("{} chunks created", chunks),
        );
    }

    pub fn embed(&self, current: u64, total: u64, model: &str) {
        self.emit(Phase::Embed, current, Some(total), format!("model={}", model));
    }

    pub fn persist(&self, chunks: u64, name: &str) {
        self.emit(Phase::Persist, chunks, Some(chunks), format!("snapshot {}", name));
    }

    pub fn load(&self, chunks: u64, name: &str) {
        self.emit(Phase::Load, chunks, None, format!("snapshot {}", name));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
