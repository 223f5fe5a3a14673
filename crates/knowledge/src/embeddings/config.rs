//! Embedding configuration types.

use manualqa_core::config::ProviderConfig;
use manualqa_core::AppConfig;
use serde::{Deserialize, Serialize};

/// Default request timeout for embedding calls, in seconds.
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Embedding settings for the active deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "gemini"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    pub batch_size: usize,

    /// Custom base URL for HTTP providers
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: 32,
            endpoint: None,
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}

/// Model and dimension used when the provider block names none.
fn provider_defaults(provider: &str, trigram_dim: usize) -> (&'static str, usize) {
    match provider {
        "ollama" => ("nomic-embed-text", 768),
        "gemini" => ("models/embedding-001", 768),
        _ => ("trigram-v1", trigram_dim),
    }
}

impl EmbeddingConfig {
    /// Build the embedding settings from the application config.
    ///
    /// The `llm.providers.<name>` block of the embedding provider supplies
    /// `embeddingModel`, `endpoint` and `timeout` when present.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let provider = config.embedding_provider.clone();
        let (default_model, dimensions) =
            provider_defaults(&provider, config.retrieval.embedding_dim);
        let block: Option<&ProviderConfig> = config.get_provider_config(&provider);

        let model = block
            .and_then(|pc| pc.embedding_model())
            .unwrap_or(default_model)
            .to_string();
        let endpoint = block.and_then(|pc| pc.endpoint()).map(str::to_string);
        let timeout_secs = block
            .and_then(|pc| pc.timeout())
            .unwrap_or(DEFAULT_EMBEDDING_TIMEOUT_SECS);

        Self {
            provider,
            model,
            dimensions,
            batch_size: config.retrieval.batch_size,
            endpoint,
            timeout_secs,
        }
    }
}
