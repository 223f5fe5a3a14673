//! Question answering over an active index.
//!
//! Embeds the question, retrieves the closest passages, renders the grounded
//! prompt and asks the model. A blank model reply is replaced by
//! [`EMPTY_ANSWER_RETRY_MESSAGE`].

use crate::embeddings::EmbeddingProvider;
use crate::rag::types::RagResponse;
use crate::vector_index::{FlatIndex, VectorIndex};
use manualqa_core::AppResult;
use manualqa_llm::{LlmClient, LlmRequest};
use manualqa_prompt::PromptAssembler;
use std::sync::Arc;

/// Stored as the assistant turn when the model returns no text.
pub const EMPTY_ANSWER_RETRY_MESSAGE: &str = "Encountered an error while generating response. \
Please enter the prompt again! Try re-arranging the prompt. For example if the prompt was \
\"parameter to configure MMI LED status\", try again with \"configure MMI LED status\"";

/// Retrieval and generation bound to one built index.
pub struct QaPipeline {
    index: FlatIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    assembler: Arc<PromptAssembler>,
    model: String,
    temperature: f32,
    top_k: usize,
}

impl QaPipeline {
    pub fn new(
        index: FlatIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        assembler: Arc<PromptAssembler>,
        model: impl Into<String>,
        temperature: f32,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            assembler,
            model: model.into(),
            temperature,
            top_k: top_k.max(1),
        }
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Change how many passages are retrieved per question.
    pub fn set_top_k(&mut self, top_k: usize) {
        self.top_k = top_k.max(1);
    }

    /// Answer one question.
    ///
    /// # Errors
    /// Embedding, search, prompt and model failures are returned unchanged.
    /// A blank reply is not an error.
    pub async fn answer(&self, question: &str) -> AppResult<RagResponse> {
        let query = self.embedder.embed(question).await?;
        let hits = self.index.search(&query, self.top_k)?;

        tracing::info!(
            "Retrieved {} passages (best score: {:.3})",
            hits.len(),
            hits.first().map(|h| h.score).unwrap_or(0.0)
        );

        let passages: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        let prompt = self.assembler.build(&passages, question)?;

        let mut request =
            LlmRequest::new(prompt.user, self.model.clone()).with_temperature(self.temperature);
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }

        tracing::debug!(
            "Requesting answer from {} (model: {})",
            self.llm.provider_name(),
            self.model
        );
        let response = self.llm.complete(&request).await?;

        if response.is_blank() {
            tracing::warn!("Model returned a blank answer; substituting retry message");
            return Ok(RagResponse::new(
                EMPTY_ANSWER_RETRY_MESSAGE.to_string(),
                &hits,
                true,
            ));
        }

        Ok(RagResponse::new(response.content, &hits, false))
    }
}

impl std::fmt::Debug for QaPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaPipeline")
            .field("chunks", &self.index.len())
            .field("embedder", &self.embedder)
            .field("llm", &self.llm.provider_name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_k", &self.top_k)
            .finish()
    }
}
