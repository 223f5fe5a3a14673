//! Error types for ManualQA.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! provider, extraction and index failures. Dataset-selection failures carry
//! their own variants so callers can report them without inspecting strings.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for ManualQA.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Prompt assembly errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// A source document could not be parsed into text
    #[error("Failed to extract text from {path:?}: {reason}")]
    TextExtraction { path: PathBuf, reason: String },

    /// A dataset is unknown or its source documents cannot be read
    #[error("Dataset '{dataset}' is unavailable: {}", describe_missing(.missing))]
    DatasetUnavailable {
        dataset: String,
        missing: Vec<PathBuf>,
    },

    /// Embedding or index construction failed
    #[error("Index build failed: {0}")]
    IndexBuild(String),

    /// No persisted snapshot exists under the requested name
    #[error("Index snapshot not found: {0}")]
    IndexNotFound(String),

    /// A persisted snapshot exists but cannot be trusted
    #[error("Index snapshot is corrupt: {0}")]
    IndexCorrupt(String),

    /// Caller supplied an argument outside the accepted range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

fn describe_missing(missing: &[PathBuf]) -> String {
    if missing.is_empty() {
        return "no such dataset".to_string();
    }
    let paths: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
    format!("missing source documents: {}", paths.join(", "))
}

impl AppError {
    /// True for load-time snapshot failures that a rebuild can repair.
    pub fn is_rebuildable(&self) -> bool {
        matches!(self, AppError::IndexNotFound(_) | AppError::IndexCorrupt(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
