//! Command handlers for the ManualQA CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod datasets;
pub mod index;
pub mod output;
pub mod query;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use datasets::DatasetsCommand;
pub use index::IndexCommand;
pub use query::QueryCommand;
