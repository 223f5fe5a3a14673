//! Index command handler.
//!
//! Rebuilds a dataset from its sources and persists the snapshot.

use super::output::{print_json, stderr_progress};
use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::{snapshot, DatasetIndexer};

/// Build and persist the index for a dataset
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Dataset label or name
    pub dataset: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command for dataset '{}'", self.dataset);

        let indexer = DatasetIndexer::from_app_config(config, stderr_progress()).await?;
        let built = indexer.build(&self.dataset).await?;
        let stats = snapshot::stats(&indexer.config().data_dir, &built.slug)?;

        if self.json {
            return print_json(&stats);
        }

        println!(
            "Indexed '{}': {} sources, {} chunks (dim {}, {}/{}), {} bytes",
            stats.dataset,
            stats.sources_count,
            stats.chunks_count,
            stats.dimension,
            stats.provider,
            stats.model,
            stats.db_size_bytes
        );

        Ok(())
    }
}
