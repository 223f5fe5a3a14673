//! Dataset indexing: resolve, extract, chunk, embed and persist.
//!
//! [`DatasetIndexer::build`] always rebuilds from the source documents.
//! [`DatasetIndexer::load_fresh`] reuses a persisted snapshot when it still
//! matches the sources and the embedder, and rebuilds otherwise if allowed.

use crate::catalog::{DatasetCatalog, ResolvedDataset};
use crate::chunker::chunk_documents;
use crate::config::KnowledgeConfig;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::extract::{file_sha256, load_document};
use crate::progress::ProgressReporter;
use crate::snapshot;
use crate::types::{SnapshotMeta, SourceRecord};
use crate::vector_index::{FlatIndex, VectorIndex};
use chrono::Utc;
use manualqa_core::{AppConfig, AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;

/// An index ready to become the active one.
#[derive(Debug, Clone)]
pub struct BuiltDataset {
    pub label: String,
    pub slug: String,
    pub index: FlatIndex,
    pub meta: SnapshotMeta,
}

pub struct DatasetIndexer {
    config: KnowledgeConfig,
    catalog: DatasetCatalog,
    embedder: Arc<dyn EmbeddingProvider>,
    progress: ProgressReporter,
}

impl DatasetIndexer {
    pub fn new(
        config: KnowledgeConfig,
        catalog: DatasetCatalog,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            config,
            catalog,
            embedder,
            progress: ProgressReporter::noop(),
        }
    }

    /// Build the indexer described by `config`, creating its embedding provider.
    ///
    /// # Errors
    /// `AppError::Config` for invalid settings or a missing credential.
    /// HTTP providers that cannot be reached fail here too.
    pub async fn from_app_config(config: &AppConfig, progress: ProgressReporter) -> AppResult<Self> {
        let knowledge = KnowledgeConfig::from_app_config(config)?;
        knowledge.validate()?;

        config.check_credentials(&config.embedding_provider)?;
        let api_key = config.resolve_api_key(&config.embedding_provider);
        let embedder = create_provider(&knowledge.embedding, api_key.as_deref()).await?;

        let catalog = DatasetCatalog::from_app_config(config);
        Ok(Self::new(knowledge, catalog, embedder).with_progress(progress))
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Rebuild `name` from its sources and persist the snapshot.
    ///
    /// Nothing is written unless every document was extracted and every
    /// chunk embedded.
    ///
    /// # Errors
    /// - `AppError::DatasetUnavailable` if the dataset is unknown or a source is missing
    /// - `AppError::TextExtraction` if a source cannot be parsed
    /// - `AppError::IndexBuild` if chunking, embedding or persisting fails
    pub async fn build(&self, name: &str) -> AppResult<BuiltDataset> {
        let resolved = self.catalog.resolve(name)?;
        self.progress
            .discover(resolved.files.len() as u64, &resolved.label);

        tracing::info!(
            "Indexing dataset '{}' ({} files)",
            resolved.label,
            resolved.files.len()
        );

        let total = resolved.files.len() as u64;
        let mut documents = Vec::with_capacity(resolved.files.len());
        for (i, (id, path)) in resolved.files.iter().enumerate() {
            self.progress.extract(i as u64 + 1, total, id);
            documents.push(load_document(path, id.clone())?);
        }

        let chunks = chunk_documents(&documents, &self.config.chunking);
        self.progress.chunk(documents.len() as u64, chunks.len());
        tracing::info!(
            "Chunked {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        let mut per_source: HashMap<&str, usize> = HashMap::new();
        for chunk in &chunks {
            *per_source.entry(chunk.source.as_str()).or_default() += 1;
        }
        let sources: Vec<SourceRecord> = documents
            .iter()
            .map(|doc| SourceRecord {
                path: doc.id.clone(),
                sha256: doc.sha256.clone(),
                size_bytes: doc.size_bytes,
                chunk_count: per_source.get(doc.id.as_str()).copied().unwrap_or(0),
            })
            .collect();

        let index = FlatIndex::build(
            chunks,
            self.embedder.as_ref(),
            self.config.batch_size,
            &self.progress,
        )
        .await?;

        let meta = SnapshotMeta {
            name: resolved.slug.clone(),
            dataset: resolved.label.clone(),
            provider: self.embedder.provider_name().to_string(),
            model: self.embedder.model_name().to_string(),
            dimension: index.dimension(),
            chunk_size: self.config.chunking.chunk_size,
            chunk_overlap: self.config.chunking.overlap,
            created_at: Utc::now(),
            sources,
        };

        snapshot::persist(&self.config.data_dir, &resolved.slug, &index, &meta).map_err(
            |e| match e {
                AppError::IndexBuild(_) => e,
                other => AppError::IndexBuild(format!("failed to persist snapshot: {}", other)),
            },
        )?;
        self.progress.persist(index.len() as u64, &resolved.slug);

        Ok(BuiltDataset {
            label: resolved.label,
            slug: resolved.slug,
            index,
            meta,
        })
    }

    /// Load the persisted snapshot of `name`, rebuilding it when needed.
    ///
    /// A snapshot is reused only if it was built with the current embedder
    /// and chunk settings from byte-identical sources. When the sources can
    /// no longer be read the snapshot is served as is.
    ///
    /// # Errors
    /// With `rebuild_if_missing` false, a missing snapshot gives
    /// `AppError::IndexNotFound` and a corrupt or stale one gives
    /// `AppError::IndexCorrupt`. Rebuild errors are those of [`Self::build`].
    pub async fn load_fresh(&self, name: &str, rebuild_if_missing: bool) -> AppResult<BuiltDataset> {
        let dataset = self
            .catalog
            .find(name)
            .ok_or_else(|| AppError::DatasetUnavailable {
                dataset: name.to_string(),
                missing: Vec::new(),
            })?;
        let slug = dataset.slug();
        let label = dataset.label.clone();

        let failure = match snapshot::load(&self.config.data_dir, &slug) {
            Ok((index, meta)) => match self.staleness(&meta) {
                None => {
                    self.progress.load(index.len() as u64, &slug);
                    return Ok(BuiltDataset {
                        label,
                        slug,
                        index,
                        meta,
                    });
                }
                Some(reason) => {
                    AppError::IndexCorrupt(format!("snapshot '{}' is stale: {}", slug, reason))
                }
            },
            Err(e) => e,
        };

        if rebuild_if_missing && failure.is_rebuildable() {
            tracing::info!("Rebuilding '{}': {}", slug, failure);
            return self.build(name).await;
        }

        Err(failure)
    }

    /// Why `meta` no longer matches the current setup, if it doesn't.
    fn staleness(&self, meta: &SnapshotMeta) -> Option<String> {
        let embedder = &self.embedder;
        if meta.provider != embedder.provider_name() || meta.model != embedder.model_name() {
            return Some(format!(
                "built with {}/{}, current embedder is {}/{}",
                meta.provider,
                meta.model,
                embedder.provider_name(),
                embedder.model_name()
            ));
        }
        if meta.dimension != embedder.dimensions() {
            return Some(format!(
                "dimension {} differs from embedder dimension {}",
                meta.dimension,
                embedder.dimensions()
            ));
        }

        let chunking = &self.config.chunking;
        if meta.chunk_size != chunking.chunk_size || meta.chunk_overlap != chunking.overlap {
            return Some(format!(
                "chunked with {}/{}, current settings are {}/{}",
                meta.chunk_size, meta.chunk_overlap, chunking.chunk_size, chunking.overlap
            ));
        }

        let resolved = match self.catalog.resolve(&meta.name) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("Serving snapshot '{}' without checking sources: {}", meta.name, e);
                return None;
            }
        };

        sources_changed(&resolved, &meta.sources)
    }
}

fn sources_changed(resolved: &ResolvedDataset, recorded: &[SourceRecord]) -> Option<String> {
    if resolved.files.len() != recorded.len() {
        return Some(format!(
            "dataset now has {} sources, snapshot has {}",
            resolved.files.len(),
            recorded.len()
        ));
    }

    for ((id, path), record) in resolved.files.iter().zip(recorded) {
        if *id != record.path {
            return Some(format!("source {} replaced by {}", record.path, id));
        }
        match file_sha256(path) {
            Ok(sha) if sha == record.sha256 => {}
            Ok(_) => return Some(format!("{} has changed", id)),
            Err(e) => return Some(format!("{} cannot be read: {}", id, e)),
        }
    }

    None
}

impl std::fmt::Debug for DatasetIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetIndexer")
            .field("data_dir", &self.config.data_dir)
            .field("datasets", &self.catalog.list().len())
            .field("embedder", &self.embedder)
            .finish()
    }
}
