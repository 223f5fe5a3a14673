//! Prompt assembly for ManualQA.
//!
//! This crate turns retrieved passages and a user question into a single
//! grounded prompt:
//! - Handlebars template rendering
//! - A fixed instruction that restricts the model to the supplied context
//! - A sentinel phrase the model must use when the context lacks the answer

pub mod builder;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, PromptAssembler, GROUNDED_ANSWER_TEMPLATE, NOT_IN_CONTEXT_ANSWER};
pub use types::{BuiltPrompt, BuiltPromptMetadata};
