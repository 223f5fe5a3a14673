//! Ask command handler.
//!
//! Rebuilds the dataset and answers a single question.

use super::output::{print_response, stderr_progress};
use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::ConversationSession;

/// Rebuild a dataset and answer one question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Dataset label or name
    pub dataset: String,

    /// The question to ask
    pub question: String,

    /// Number of passages to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for dataset '{}'", self.dataset);

        let mut session = ConversationSession::from_app_config(config, stderr_progress()).await?;
        let active = session.select_dataset(&self.dataset).await?;
        if let Some(top_k) = self.top_k {
            active.set_top_k(top_k);
        }

        let response = active.ask(&self.question).await?;
        tracing::debug!(
            "Answered with {} sources (max score {:.3}, retry substituted: {})",
            response.sources.len(),
            response.max_score,
            response.retry_substituted
        );

        print_response(&response, self.json)
    }
}
