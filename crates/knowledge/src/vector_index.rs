//! In-memory vector index over dataset chunks.
//!
//! Similarity is cosine similarity. Results are ordered by descending score
//! with ties broken by ascending chunk id, so repeated searches on the same
//! index always agree.

use crate::embeddings::EmbeddingProvider;
use crate::progress::ProgressReporter;
use crate::types::{Chunk, SearchHit};
use manualqa_core::{AppError, AppResult};

/// Read side of a built index.
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored vector has.
    fn dimension(&self) -> usize;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// Asking for more than `len()` results returns every entry.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>>;
}

/// A chunk together with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Exhaustive-scan index. Immutable once built.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Embed every chunk and build an index.
    ///
    /// Chunks are embedded in batches of `batch_size`. Any embedding failure
    /// aborts the build.
    ///
    /// # Errors
    /// `AppError::IndexBuild` if `chunks` is empty, the provider fails, or it
    /// returns the wrong number of vectors or malformed vectors.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
        progress: &ProgressReporter,
    ) -> AppResult<Self> {
        if chunks.is_empty() {
            return Err(AppError::IndexBuild(
                "no chunks to index; the dataset produced no text".to_string(),
            ));
        }

        let total = chunks.len();
        let batch_size = batch_size.max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(total);

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| AppError::IndexBuild(format!("embedding failed: {}", e)))?;

            if embedded.len() != batch.len() {
                return Err(AppError::IndexBuild(format!(
                    "embedding provider returned {} vectors for {} chunks",
                    embedded.len(),
                    batch.len()
                )));
            }

            vectors.extend(embedded);
            progress.embed(vectors.len() as u64, total as u64, embedder.model_name());
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or_default();
        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        Self::from_entries(dimension, entries).map_err(|e| match e {
            AppError::InvalidInput(msg) => AppError::IndexBuild(msg),
            other => other,
        })
    }

    /// Assemble an index from already embedded entries.
    ///
    /// # Errors
    /// `AppError::InvalidInput` if there are no entries, the dimension is 0,
    /// or a vector has the wrong length or a non-finite component.
    pub fn from_entries(dimension: usize, entries: Vec<IndexEntry>) -> AppResult<Self> {
        if entries.is_empty() {
            return Err(AppError::InvalidInput("index has no entries".to_string()));
        }
        if dimension == 0 {
            return Err(AppError::InvalidInput(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        for entry in &entries {
            if entry.vector.len() != dimension {
                return Err(AppError::InvalidInput(format!(
                    "chunk {} has dimension {}, expected {}",
                    entry.chunk.id,
                    entry.vector.len(),
                    dimension
                )));
            }
            if entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(AppError::InvalidInput(format!(
                    "chunk {} has a non-finite embedding component",
                    entry.chunk.id
                )));
            }
        }

        Ok(Self { dimension, entries })
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Ordered chunks, without their vectors.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(AppError::InvalidInput("k must be at least 1".to_string()));
        }
        if query.len() != self.dimension {
            return Err(AppError::InvalidInput(format!(
                "query has dimension {}, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(&IndexEntry, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry, cosine_similarity(query, &entry.vector)))
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            sb.total_cmp(sa)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(entry, score)| SearchHit {
                chunk: entry.chunk.clone(),
                score,
            })
            .collect())
    }
}

/// Cosine similarity of two equal-length vectors; 0.0 when either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_nan() {
        0.0
    } else {
        score.clamp(-1.0, 1.0)
    }
}
