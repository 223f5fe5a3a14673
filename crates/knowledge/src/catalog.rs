//! Dataset catalog: user-facing labels mapped to ordered source documents.

use crate::extract::ContentType;
use manualqa_core::{AppConfig, AppError, AppResult, DatasetConfig};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A dataset whose sources have been resolved to concrete files.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDataset {
    /// Snapshot name
    pub slug: String,

    pub label: String,

    /// `(document id, absolute path)` in catalog order
    pub files: Vec<(String, PathBuf)>,
}

#[derive(Debug, Clone)]
pub struct DatasetCatalog {
    datasets: Vec<DatasetConfig>,
    documents_root: PathBuf,
}

impl DatasetCatalog {
    pub fn new(datasets: Vec<DatasetConfig>, documents_root: impl Into<PathBuf>) -> Self {
        Self {
            datasets,
            documents_root: documents_root.into(),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.datasets.clone(), config.documents_root())
    }

    pub fn list(&self) -> &[DatasetConfig] {
        &self.datasets
    }

    pub fn documents_root(&self) -> &Path {
        &self.documents_root
    }

    /// Find a dataset by label or slug, ignoring case.
    pub fn find(&self, name: &str) -> Option<&DatasetConfig> {
        let wanted = name.trim();
        self.datasets.iter().find(|d| {
            d.label.eq_ignore_ascii_case(wanted) || d.slug().eq_ignore_ascii_case(wanted)
        })
    }

    /// Resolve a dataset to its files.
    ///
    /// Directory sources expand to the supported files beneath them, sorted
    /// by path. Every missing source is reported together.
    ///
    /// # Errors
    /// `AppError::DatasetUnavailable` if the name is unknown (empty `missing`
    /// list) or any source does not exist.
    pub fn resolve(&self, name: &str) -> AppResult<ResolvedDataset> {
        let dataset = self
            .find(name)
            .ok_or_else(|| AppError::DatasetUnavailable {
                dataset: name.to_string(),
                missing: Vec::new(),
            })?;

        let mut files = Vec::new();
        let mut missing = Vec::new();

        for source in &dataset.sources {
            let path = self.absolute(source);
            if path.is_file() {
                files.push((document_id(source), path));
            } else if path.is_dir() {
                files.extend(expand_dir(&path, source)?);
            } else {
                missing.push(path);
            }
        }

        if !missing.is_empty() {
            return Err(AppError::DatasetUnavailable {
                dataset: dataset.label.clone(),
                missing,
            });
        }

        tracing::debug!(
            "Resolved dataset '{}' to {} files",
            dataset.label,
            files.len()
        );

        Ok(ResolvedDataset {
            slug: dataset.slug(),
            label: dataset.label.clone(),
            files,
        })
    }

    fn absolute(&self, source: &Path) -> PathBuf {
        if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.documents_root.join(source)
        }
    }
}

fn document_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn expand_dir(dir: &Path, source: &Path) -> AppResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            AppError::Io(std::io::Error::other(format!(
                "Failed to walk {:?}: {}",
                dir, e
            )))
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !ContentType::from_path(path).is_supported() {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        files.push((document_id(&source.join(relative)), path.to_path_buf()));
    }

    Ok(files)
}
