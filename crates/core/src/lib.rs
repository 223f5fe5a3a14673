//! ManualQA Core Library
//!
//! This crate provides the foundational utilities shared by every ManualQA crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management, including the dataset catalog

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, DatasetConfig, RetrievalConfig};
pub use error::{AppError, AppResult};
