//! Knowledge pipeline configuration and on-disk layout.

use crate::chunker::ChunkConfig;
use crate::embeddings::EmbeddingConfig;
use manualqa_core::{AppConfig, AppError, AppResult};
use std::path::{Path, PathBuf};

/// Settings the indexing and answering pipeline needs, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    /// `.manualqa` directory holding snapshots and the question log
    pub data_dir: PathBuf,

    /// Directory relative dataset sources resolve against
    pub documents_root: PathBuf,

    pub chunking: ChunkConfig,

    /// Passages retrieved per question
    pub top_k: usize,

    /// Chunks embedded per provider call
    pub batch_size: usize,

    /// Answer model
    pub model: String,

    pub temperature: f32,

    pub embedding: EmbeddingConfig,
}

impl KnowledgeConfig {
    /// Resolve the pipeline settings, validating the application config first.
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let chunking = ChunkConfig::new(
            config.retrieval.chunk_size,
            config.retrieval.chunk_overlap,
        )?;

        Ok(Self {
            data_dir: config.data_dir(),
            documents_root: config.documents_root(),
            chunking,
            top_k: config.retrieval.top_k,
            batch_size: config.retrieval.batch_size,
            model: config.model.clone(),
            temperature: config.temperature(),
            embedding: EmbeddingConfig::from_app_config(config),
        })
    }

    /// Check the values that are not enforced by construction.
    pub fn validate(&self) -> AppResult<()> {
        self.chunking.validate()?;
        if self.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config("batchSize must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Directory holding every snapshot.
pub fn get_indexes_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("indexes")
}

/// Directory of one named snapshot.
pub fn get_snapshot_dir(data_dir: &Path, name: &str) -> PathBuf {
    get_indexes_dir(data_dir).join(name)
}

/// Get the SQLite database path for a snapshot.
pub fn get_snapshot_path(data_dir: &Path, name: &str) -> PathBuf {
    get_snapshot_dir(data_dir, name).join("index.sqlite")
}

/// Append-only log of submitted questions.
pub fn get_question_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("questions.log")
}
