//! Fakes and fixtures shared by the scenario tests.

use crate::catalog::DatasetCatalog;
use crate::chunker::ChunkConfig;
use crate::config::{get_question_log_path, KnowledgeConfig};
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use crate::indexer::DatasetIndexer;
use crate::question_log::QuestionLog;
use crate::session::ConversationSession;
use manualqa_core::{AppError, AppResult, DatasetConfig};
use manualqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use manualqa_prompt::PromptAssembler;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One dimension per ASCII letter, counting occurrences. Can be switched to fail.
#[derive(Debug, Default)]
pub struct LetterCountEmbedder {
    failing: AtomicBool,
}

impl LetterCountEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut counts = vec![0.0; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        counts
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for LetterCountEmbedder {
    fn provider_name(&self) -> &str {
        "letters"
    }

    fn model_name(&self) -> &str {
        "letter-count"
    }

    fn dimensions(&self) -> usize {
        26
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Embedding("embedding service unavailable".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Returns a fixed reply, or fails, and remembers every request.
pub struct ScriptedLlm {
    reply: Mutex<Option<String>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(reply.to_string())),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Change the reply; `None` makes every call fail.
    pub fn set_reply(&self, reply: Option<&str>) {
        *self.reply.lock().unwrap() = reply.map(str::to_string);
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match self.reply.lock().unwrap().clone() {
            Some(content) => Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
            }),
            None => Err(AppError::Llm("model unavailable".to_string())),
        }
    }
}

/// Pipeline settings rooted at `root` with small chunks.
pub fn knowledge_config(root: &Path, chunk_size: usize, overlap: usize) -> KnowledgeConfig {
    KnowledgeConfig {
        data_dir: root.join(".manualqa"),
        documents_root: root.to_path_buf(),
        chunking: ChunkConfig::new(chunk_size, overlap).unwrap(),
        top_k: 2,
        batch_size: 2,
        model: "test-model".to_string(),
        temperature: 0.0,
        embedding: EmbeddingConfig::default(),
    }
}

pub fn indexer(
    config: KnowledgeConfig,
    datasets: Vec<DatasetConfig>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> DatasetIndexer {
    let catalog = DatasetCatalog::new(datasets, config.documents_root.clone());
    DatasetIndexer::new(config, catalog, embedder)
}

pub fn session(
    config: KnowledgeConfig,
    datasets: Vec<DatasetConfig>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
) -> ConversationSession {
    let question_log = QuestionLog::new(get_question_log_path(&config.data_dir));
    std::fs::create_dir_all(&config.data_dir).unwrap();
    ConversationSession::new(
        indexer(config, datasets, embedder),
        llm,
        Arc::new(PromptAssembler::new().unwrap()),
        question_log,
    )
}

pub fn write_doc(root: &Path, name: &str, text: &str) -> PathBuf {
    let path = root.join(name);
    std::fs::write(&path, text).unwrap();
    path
}
