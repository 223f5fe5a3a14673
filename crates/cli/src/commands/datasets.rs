//! Datasets command handler.
//!
//! Lists the catalog with resolved sources and snapshot state, plus any
//! snapshot left on disk by a dataset that is no longer configured.

use super::output::print_json;
use clap::Args;
use manualqa_core::{config::AppConfig, AppError, AppResult};
use manualqa_knowledge::{snapshot, DatasetCatalog, SnapshotStats};
use serde::Serialize;

/// List configured datasets
#[derive(Args, Debug)]
pub struct DatasetsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetListing {
    label: String,
    name: String,
    sources: Vec<String>,
    missing: Vec<String>,
    snapshot: Option<SnapshotStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetsReport {
    datasets: Vec<DatasetListing>,
    unlisted_snapshots: Vec<String>,
}

impl DatasetsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing datasets command");

        let catalog = DatasetCatalog::from_app_config(config);
        let data_dir = config.data_dir();
        let mut listing = Vec::new();

        for dataset in catalog.list() {
            let name = dataset.slug();
            let (sources, missing) = match catalog.resolve(&name) {
                Ok(resolved) => (
                    resolved.files.into_iter().map(|(id, _)| id).collect(),
                    Vec::new(),
                ),
                Err(AppError::DatasetUnavailable { missing, .. }) => (
                    Vec::new(),
                    missing.iter().map(|p| p.display().to_string()).collect(),
                ),
                Err(e) => return Err(e),
            };

            let snapshot = match snapshot::stats(&data_dir, &name) {
                Ok(stats) => Some(stats),
                Err(AppError::IndexNotFound(_)) => None,
                Err(e) => {
                    tracing::warn!("Cannot read snapshot '{}': {}", name, e);
                    None
                }
            };

            listing.push(DatasetListing {
                label: dataset.label.clone(),
                name,
                sources,
                missing,
                snapshot,
            });
        }

        let unlisted_snapshots = unlisted(snapshot::list(&data_dir)?, &listing);

        if self.json {
            return print_json(&DatasetsReport {
                datasets: listing,
                unlisted_snapshots,
            });
        }

        if listing.is_empty() {
            println!("No datasets configured");
        }

        for entry in &listing {
            println!("{} ({})", entry.label, entry.name);
            for source in &entry.sources {
                println!("  - {}", source);
            }
            for path in &entry.missing {
                println!("  - {} (missing)", path);
            }
            match &entry.snapshot {
                Some(stats) => println!(
                    "  snapshot: {} chunks, {}/{}, built {}",
                    stats.chunks_count,
                    stats.provider,
                    stats.model,
                    stats.created_at.format("%Y-%m-%d %H:%M UTC")
                ),
                None => println!("  snapshot: none"),
            }
        }

        if !unlisted_snapshots.is_empty() {
            println!("Snapshots without a configured dataset:");
            for name in &unlisted_snapshots {
                println!("  - {}", name);
            }
        }

        Ok(())
    }
}

/// Snapshot names that no configured dataset maps to.
fn unlisted(snapshots: Vec<String>, listing: &[DatasetListing]) -> Vec<String> {
    snapshots
        .into_iter()
        .filter(|name| !listing.iter().any(|entry| entry.name == *name))
        .collect()
}
