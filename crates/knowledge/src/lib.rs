//! Document question answering over named datasets.
//!
//! A dataset is an ordered list of manuals. Selecting one extracts their
//! text, splits it into overlapping chunks, embeds every chunk and persists
//! the resulting index as a snapshot. Questions are answered by retrieving
//! the closest chunks and asking a language model to answer from them only.
//!
//! [`ConversationSession`] is the entry point; the modules below are usable
//! on their own.

pub mod catalog;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod indexer;
pub mod progress;
pub mod question_log;
pub mod rag;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use catalog::{DatasetCatalog, ResolvedDataset};
pub use chunker::{chunk_documents, split_text, ChunkConfig};
pub use config::KnowledgeConfig;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use indexer::{BuiltDataset, DatasetIndexer};
pub use progress::{Phase, ProgressEvent, ProgressReporter};
pub use question_log::QuestionLog;
pub use rag::{QaPipeline, RagResponse, RagSourceRef, EMPTY_ANSWER_RETRY_MESSAGE};
pub use session::{ActiveConversation, ConversationSession, ConversationTurn, Role};
pub use types::{Chunk, Document, SearchHit, SnapshotMeta, SnapshotStats, SourceRecord};
pub use vector_index::{FlatIndex, VectorIndex};
