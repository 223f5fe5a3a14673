//! Conversation state: the selected dataset, its index and the chat history.
//!
//! A [`ConversationSession`] starts with no dataset. Selecting one builds an
//! index and yields an [`ActiveConversation`], the only place questions can
//! be asked. Selecting again replaces it and starts a fresh history; a failed
//! selection leaves the current one in place.

use crate::catalog::DatasetCatalog;
use crate::config::{get_question_log_path, KnowledgeConfig};
use crate::indexer::{BuiltDataset, DatasetIndexer};
use crate::progress::ProgressReporter;
use crate::question_log::QuestionLog;
use crate::rag::{QaPipeline, RagResponse};
use crate::vector_index::FlatIndex;
use manualqa_core::{AppConfig, AppError, AppResult};
use manualqa_llm::{create_client, LlmClient};
use manualqa_prompt::PromptAssembler;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// The selected dataset with its pipeline and history.
#[derive(Debug)]
pub struct ActiveConversation {
    label: String,
    slug: String,
    pipeline: QaPipeline,
    history: Vec<ConversationTurn>,
    question_log: QuestionLog,
}

impl ActiveConversation {
    /// Answer `question` and record both turns.
    ///
    /// The question is logged before it is answered. If retrieval or the
    /// model call fails, the history is left as it was.
    ///
    /// # Errors
    /// `AppError::InvalidInput` for a blank question, otherwise whatever the
    /// pipeline returns.
    pub async fn ask(&mut self, question: &str) -> AppResult<RagResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("question is empty".to_string()));
        }

        self.question_log.record(&self.label, question);
        tracing::info!("Answering question against '{}'", self.label);

        let response = self.pipeline.answer(question).await?;

        self.history.push(ConversationTurn {
            role: Role::User,
            content: question.to_string(),
        });
        self.history.push(ConversationTurn {
            role: Role::Assistant,
            content: response.answer.clone(),
        });

        Ok(response)
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn index(&self) -> &FlatIndex {
        self.pipeline.index()
    }

    pub fn dataset_label(&self) -> &str {
        &self.label
    }

    /// Snapshot name of the dataset.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn set_top_k(&mut self, top_k: usize) {
        self.pipeline.set_top_k(top_k);
    }
}

/// Owns the collaborators and at most one active conversation.
pub struct ConversationSession {
    indexer: DatasetIndexer,
    llm: Arc<dyn LlmClient>,
    assembler: Arc<PromptAssembler>,
    question_log: QuestionLog,
    active: Option<ActiveConversation>,
}

impl ConversationSession {
    pub fn new(
        indexer: DatasetIndexer,
        llm: Arc<dyn LlmClient>,
        assembler: Arc<PromptAssembler>,
        question_log: QuestionLog,
    ) -> Self {
        Self {
            indexer,
            llm,
            assembler,
            question_log,
            active: None,
        }
    }

    /// Wire up the embedder, model client and catalog from configuration.
    ///
    /// # Errors
    /// `AppError::Config` for invalid settings or missing credentials;
    /// embedding providers that cannot be reached fail here too.
    pub async fn from_app_config(config: &AppConfig, progress: ProgressReporter) -> AppResult<Self> {
        let indexer = DatasetIndexer::from_app_config(config, progress).await?;

        config.check_credentials(&config.provider)?;
        let llm_key = config.resolve_api_key(&config.provider);
        let provider_block = config.get_provider_config(&config.provider);
        let llm = create_client(
            &config.provider,
            provider_block.and_then(|pc| pc.endpoint()),
            llm_key.as_deref(),
            provider_block
                .and_then(|pc| pc.timeout())
                .map(Duration::from_secs),
        )?;

        let question_log = QuestionLog::new(get_question_log_path(&indexer.config().data_dir));
        tracing::debug!("Logging questions to {:?}", question_log.path());

        Ok(Self::new(
            indexer,
            llm,
            Arc::new(PromptAssembler::new()?),
            question_log,
        ))
    }

    /// Rebuild `name` from its sources and make it the active conversation.
    ///
    /// # Errors
    /// `AppError::DatasetUnavailable`, `AppError::TextExtraction` or
    /// `AppError::IndexBuild`. The previous conversation is kept on error.
    pub async fn select_dataset(&mut self, name: &str) -> AppResult<&mut ActiveConversation> {
        let built = self.indexer.build(name).await?;
        Ok(self.activate(built))
    }

    /// Make `name` active from its persisted snapshot.
    ///
    /// See [`DatasetIndexer::load_fresh`] for when the snapshot is rebuilt.
    pub async fn open_dataset(
        &mut self,
        name: &str,
        rebuild_if_missing: bool,
    ) -> AppResult<&mut ActiveConversation> {
        let built = self.indexer.load_fresh(name, rebuild_if_missing).await?;
        Ok(self.activate(built))
    }

    fn activate(&mut self, built: BuiltDataset) -> &mut ActiveConversation {
        let config = self.indexer.config();
        let pipeline = QaPipeline::new(
            built.index,
            Arc::clone(self.indexer.embedder()),
            Arc::clone(&self.llm),
            Arc::clone(&self.assembler),
            config.model.clone(),
            config.temperature,
            config.top_k,
        );

        if let Some(previous) = &self.active {
            tracing::debug!("Discarding active dataset '{}'", previous.label);
        }
        tracing::info!("Active dataset is now '{}'", built.label);

        self.active.insert(ActiveConversation {
            label: built.label,
            slug: built.slug,
            pipeline,
            history: Vec::new(),
            question_log: self.question_log.clone(),
        })
    }

    pub fn active(&self) -> Option<&ActiveConversation> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveConversation> {
        self.active.as_mut()
    }

    pub fn is_indexed(&self) -> bool {
        self.active.is_some()
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        self.indexer.catalog()
    }

    pub fn config(&self) -> &KnowledgeConfig {
        self.indexer.config()
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("indexer", &self.indexer)
            .field("llm", &self.llm.provider_name())
            .field("active", &self.active.as_ref().map(|a| a.label.as_str()))
            .finish()
    }
}
