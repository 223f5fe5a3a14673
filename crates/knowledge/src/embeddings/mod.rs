//! Embedding generation for dataset chunks and questions.
//!
//! Providers are selected by name from configuration; the trigram provider
//! runs locally and needs no network.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
