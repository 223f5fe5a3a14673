//! Configuration management for ManualQA.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Environment variables
//! - Config file (.manualqa/config.yaml)
//! - Command-line flags
//!
//! The configuration is workspace-centric: snapshots, the question log and the
//! config file all live under `<workspace>/.manualqa/`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace data directory.
pub const DATA_DIR_NAME: &str = ".manualqa";

/// LLM providers with a client implementation.
pub const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Embedding providers with an implementation.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["trigram", "ollama", "gemini"];

/// Environment variable consulted for Gemini when no provider config names one.
pub const DEFAULT_GEMINI_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Sampling temperature used when the config file does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// CLI behavior across commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .manualqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("gemini" or "ollama")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Active embedding provider ("trigram", "ollama" or "gemini")
    pub embedding_provider: String,

    /// Explicit API key, takes precedence over provider key variables
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Chunking and retrieval parameters
    pub retrieval: RetrievalConfig,

    /// Directory that relative dataset sources resolve against
    pub documents_dir: Option<PathBuf>,

    /// Dataset catalog
    pub datasets: Vec<DatasetConfig>,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: Option<String>,

    pub temperature: Option<f32>,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Gemini {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Gemini { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }

    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini {
                embedding_model, ..
            }
            | ProviderConfig::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Request timeout in seconds.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            ProviderConfig::Gemini { timeout, .. } | ProviderConfig::Ollama { timeout, .. } => {
                *timeout
            }
        }
    }
}

/// Chunking and retrieval parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Passages retrieved per question
    pub top_k: usize,

    /// Vector dimension for the trigram embedding provider
    pub embedding_dim: usize,

    /// Chunks sent per embedding request
    pub batch_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            chunk_overlap: 1_000,
            top_k: 4,
            embedding_dim: 384,
            batch_size: 32,
        }
    }
}

/// One entry of the dataset catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Stable identifier used for snapshot names; derived from the label when absent
    #[serde(default)]
    pub name: Option<String>,

    /// User-facing label, e.g. "Admin Guide"
    pub label: String,

    /// Ordered source documents or directories
    pub sources: Vec<PathBuf>,
}

impl DatasetConfig {
    pub fn new(label: &str, sources: &[&str]) -> Self {
        Self {
            name: None,
            label: label.to_string(),
            sources: sources.iter().map(PathBuf::from).collect(),
        }
    }

    /// Identifier used on disk: the explicit name, or the slugified label.
    pub fn slug(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => slugify(name),
            _ => slugify(&self.label),
        }
    }
}

/// Lowercase, alphanumeric runs joined by `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    retrieval: Option<RetrievalConfig>,
    documents: Option<DocumentsConfig>,
    datasets: Option<Vec<DatasetConfig>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentsConfig {
    dir: Option<PathBuf>,
}

/// The catalog shipped with a fresh workspace.
pub fn default_datasets() -> Vec<DatasetConfig> {
    vec![
        DatasetConfig::new("Admin Guide", &["Administrator_Guide.pdf"]),
        DatasetConfig::new("Parameters Guide", &["Parameters_Guide.pdf"]),
    ]
}

/// Generation model used for a provider when nothing else names one.
pub fn default_model_for(provider: &str) -> &'static str {
    match provider {
        "gemini" => "gemini-1.5-pro",
        _ => "llama3.2",
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: default_model_for("ollama").to_string(),
            embedding_provider: "trigram".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            retrieval: RetrievalConfig::default(),
            documents_dir: None,
            datasets: default_datasets(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, the config file and defaults.
    ///
    /// Environment variables:
    /// - `MANUALQA_WORKSPACE`: Override workspace path
    /// - `MANUALQA_CONFIG`: Path to config file
    /// - `MANUALQA_PROVIDER`: LLM provider
    /// - `MANUALQA_MODEL`: Model identifier
    /// - `MANUALQA_EMBEDDING_PROVIDER`: Embedding provider
    /// - `MANUALQA_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use manualqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with workspace and config file taken from
    /// the command line before the YAML file is located.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("MANUALQA_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        if let Ok(config_file) = std::env::var("MANUALQA_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(config_file) = config_file {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.data_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("MANUALQA_PROVIDER") {
            config.switch_provider(provider);
        }

        if let Ok(model) = std::env::var("MANUALQA_MODEL") {
            config.model = model;
        }

        if let Ok(provider) = std::env::var("MANUALQA_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }

        config.api_key = std::env::var("MANUALQA_API_KEY").ok();

        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(documents) = config_file.documents {
            result.documents_dir = documents.dir;
        }

        if let Some(datasets) = config_file.datasets {
            result.datasets = datasets;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            result.model = llm
                .providers
                .get(&llm.active_provider)
                .map(|pc| pc.model().to_string())
                .unwrap_or_else(|| default_model_for(&llm.active_provider).to_string());

            if let Some(ref embedding) = llm.active_embedding_provider {
                result.embedding_provider = embedding.clone();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the
    /// config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        embedding_provider: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.switch_provider(provider);
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(embedding_provider) = embedding_provider {
            self.embedding_provider = embedding_provider;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Change the active provider and pick up its configured model.
    fn switch_provider(&mut self, provider: String) {
        if provider == self.provider {
            return;
        }
        self.model = self
            .llm
            .as_ref()
            .and_then(|llm| llm.providers.get(&provider))
            .map(|pc| pc.model().to_string())
            .unwrap_or_else(|| default_model_for(&provider).to_string());
        self.provider = provider;
    }

    /// Get the path to the .manualqa directory.
    pub fn data_dir(&self) -> PathBuf {
        self.workspace.join(DATA_DIR_NAME)
    }

    /// Ensure the .manualqa directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        let data_dir = self.data_dir();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", DATA_DIR_NAME, e))
            })?;
        }
        Ok(())
    }

    /// Directory that relative dataset sources resolve against.
    pub fn documents_root(&self) -> PathBuf {
        match self.documents_dir {
            Some(ref dir) if dir.is_absolute() => dir.clone(),
            Some(ref dir) => self.workspace.join(dir),
            None => self.workspace.clone(),
        }
    }

    /// Sampling temperature for answer generation.
    pub fn temperature(&self) -> f32 {
        self.llm
            .as_ref()
            .and_then(|llm| llm.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key for a provider.
    ///
    /// `MANUALQA_API_KEY` wins; otherwise the provider's `apiKeyEnv` variable
    /// is read, defaulting to `GOOGLE_API_KEY` for Gemini.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::Gemini { api_key_env, .. }) => Some(api_key_env.as_str()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider == "gemini" => Some(DEFAULT_GEMINI_KEY_ENV),
            None => None,
        };

        env_var
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Fail when a provider that needs a key has none.
    pub fn check_credentials(&self, provider: &str) -> AppResult<()> {
        if provider != "gemini" || self.resolve_api_key(provider).is_some() {
            return Ok(());
        }
        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::Gemini { api_key_env, .. }) => api_key_env.clone(),
            _ => DEFAULT_GEMINI_KEY_ENV.to_string(),
        };
        Err(AppError::Config(format!(
            "API key not found: set {} or MANUALQA_API_KEY",
            env_var
        )))
    }

    /// Validate provider names, retrieval parameters and the dataset catalog.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let retrieval = &self.retrieval;
        if retrieval.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be greater than 0".to_string()));
        }
        if retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                retrieval.chunk_overlap, retrieval.chunk_size
            )));
        }
        if retrieval.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }
        if retrieval.embedding_dim == 0 || retrieval.batch_size == 0 {
            return Err(AppError::Config(
                "embeddingDim and batchSize must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            let slug = dataset.slug();
            if slug.is_empty() {
                return Err(AppError::Config(format!(
                    "Dataset '{}' has no usable name",
                    dataset.label
                )));
            }
            if !seen.insert(slug.clone()) {
                return Err(AppError::Config(format!("Duplicate dataset name: {}", slug)));
            }
        }

        Ok(())
    }
}
