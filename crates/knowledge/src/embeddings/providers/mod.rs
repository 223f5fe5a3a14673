//! Embedding provider implementations.

pub mod gemini;
pub mod ollama;
pub mod trigram;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use trigram::TrigramProvider;

use manualqa_core::AppResult;
use std::future::Future;
use std::time::Duration;

/// Maximum attempts per HTTP embedding call
const MAX_RETRIES: u32 = 3;

/// Backoff before the second attempt; doubles on each retry
const INITIAL_BACKOFF_MS: u64 = 100;

/// Run `call` until it succeeds or the attempts run out, returning the last error.
pub(crate) async fn with_retries<T, F, Fut>(provider: &str, mut call: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= MAX_RETRIES {
                    return Err(e);
                }

                let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                tracing::warn!(
                    "{} embedding failed (attempt {}/{}), retrying in {}ms: {}",
                    provider,
                    attempt,
                    MAX_RETRIES,
                    backoff_ms,
                    e
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}
