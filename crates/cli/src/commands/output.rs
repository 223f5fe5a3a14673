//! Shared output helpers.
//!
//! Answers and listings go to stdout; progress goes to stderr.

use manualqa_core::AppResult;
use manualqa_knowledge::{ProgressReporter, RagResponse};
use serde::Serialize;
use std::sync::Arc;

/// Progress reporter that prints each event on stderr.
pub fn stderr_progress() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
}

pub fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_response(response: &RagResponse, json: bool) -> AppResult<()> {
    if json {
        return print_json(response);
    }

    println!("{}", response.answer);
    println!();

    if response.sources.is_empty() {
        println!("Sources: (no sources available)");
    } else {
        println!("Sources:");
        for source_ref in &response.sources {
            println!("- {} ({})", source_ref.source, source_ref.location);
        }
    }

    Ok(())
}
