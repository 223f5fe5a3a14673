//! ManualQA CLI
//!
//! Main entry point for the manualqa command-line tool.
//! Answers questions about product manuals from a configured dataset catalog.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, DatasetsCommand, IndexCommand, QueryCommand};
use manualqa_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// ManualQA - grounded answers from product manuals
#[derive(Parser, Debug)]
#[command(name = "manualqa")]
#[command(about = "Grounded question answering over product manuals", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MANUALQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "MANUALQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// LLM provider (ollama, gemini)
    #[arg(short, long, global = true, env = "MANUALQA_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "MANUALQA_MODEL")]
    model: Option<String>,

    /// Embedding provider (trigram, ollama, gemini)
    #[arg(short, long, global = true, env = "MANUALQA_EMBEDDING_PROVIDER")]
    embedding_provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured datasets and their snapshots
    Datasets(DatasetsCommand),

    /// Build and persist the index for a dataset
    Index(IndexCommand),

    /// Rebuild a dataset and answer one question
    Ask(AskCommand),

    /// Answer one question from a persisted snapshot
    Query(QueryCommand),

    /// Interactive conversation
    Chat(ChatCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Workspace and config file decide which YAML is read, so they go first
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    let config = config.with_overrides(
        cli.provider,
        cli.model,
        cli.embedding_provider,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("ManualQA CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);
    tracing::debug!("Embedding provider: {}", config.embedding_provider);

    config.ensure_data_dir()?;

    let command_name = match &cli.command {
        Commands::Datasets(_) => "datasets",
        Commands::Index(_) => "index",
        Commands::Ask(_) => "ask",
        Commands::Query(_) => "query",
        Commands::Chat(_) => "chat",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Datasets(cmd) => cmd.execute(&config),
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
