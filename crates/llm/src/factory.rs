//! LLM provider factory.
//!
//! Creates LLM clients from a provider name plus the resolved endpoint,
//! credential and timeout. Credential lookup itself lives in the core config.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, GeminiClient, OllamaClient};
use crate::types::ProviderType;
use manualqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by Gemini
/// * `timeout` - Optional request timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key is
/// missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    tracing::debug!("Creating {} client", provider_type);

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::build(base_url, timeout)?))
        }
        ProviderType::Gemini => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Gemini provider requires API key".to_string())
            })?;
            let client = match endpoint {
                Some(base_url) => GeminiClient::build(base_url, api_key, timeout)?,
                None => GeminiClient::build(
                    crate::providers::gemini::DEFAULT_GEMINI_URL,
                    api_key,
                    timeout,
                )?,
            };
            Ok(Arc::new(client))
        }
    }
}
