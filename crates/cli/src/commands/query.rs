//! Query command handler.
//!
//! Answers from a persisted snapshot, rebuilding it only when it is
//! missing, corrupt or stale.

use super::output::{print_response, stderr_progress};
use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::ConversationSession;

/// Answer one question from a persisted snapshot
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Dataset label or name
    pub dataset: String,

    /// The question to ask
    pub question: String,

    /// Number of passages to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Fail instead of rebuilding a missing or outdated snapshot
    #[arg(long)]
    pub no_rebuild: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command for dataset '{}'", self.dataset);

        let mut session = ConversationSession::from_app_config(config, stderr_progress()).await?;
        let active = match session.open_dataset(&self.dataset, !self.no_rebuild).await {
            Ok(active) => active,
            Err(e) if e.is_rebuildable() => {
                eprintln!(
                    "Run 'manualqa index \"{}\"' to rebuild the snapshot.",
                    self.dataset
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        if let Some(top_k) = self.top_k {
            active.set_top_k(top_k);
        }

        let response = active.ask(&self.question).await?;
        print_response(&response, self.json)
    }
}
