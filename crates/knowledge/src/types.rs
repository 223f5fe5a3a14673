//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw text extracted from one source file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier shown to users, the path relative to the documents root
    pub id: String,

    /// Absolute path of the source file
    pub path: PathBuf,

    /// Extracted text, possibly empty for unrecognized formats
    pub text: String,

    /// Hex SHA-256 of the source file bytes
    pub sha256: String,

    /// Source file size in bytes
    pub size_bytes: u64,
}

/// A passage of a document, sized for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Sequence number across the whole dataset, starting at 0
    pub id: usize,

    /// Identifier of the document the chunk came from
    pub source: String,

    /// Position of the chunk within its document
    pub position: usize,

    /// Chunk text
    pub text: String,
}

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,

    /// Cosine similarity to the query, in [-1, 1]
    pub score: f32,
}

/// Per-source record kept in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Document identifier
    pub path: String,

    /// Hex SHA-256 of the file when the snapshot was built
    pub sha256: String,

    /// File size in bytes
    pub size_bytes: u64,

    /// Chunks produced from this source
    pub chunk_count: usize,
}

/// Metadata stored alongside a persisted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Snapshot name (dataset slug)
    pub name: String,

    /// User-facing dataset label
    pub dataset: String,

    /// Embedding provider that produced the vectors
    pub provider: String,

    /// Embedding model that produced the vectors
    pub model: String,

    /// Vector dimension
    pub dimension: usize,

    pub chunk_size: usize,
    pub chunk_overlap: usize,

    /// When the snapshot was built
    pub created_at: DateTime<Utc>,

    /// Sources in dataset order
    pub sources: Vec<SourceRecord>,
}

/// Statistics for a persisted snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    pub name: String,
    pub dataset: String,
    pub sources_count: usize,
    pub chunks_count: usize,
    pub dimension: usize,
    pub provider: String,
    pub model: String,
    pub db_size_bytes: u64,
    pub created_at: DateTime<Utc>,
}
