//! Retrieval-augmented answering.

pub mod pipeline;
pub mod types;

pub use pipeline::{QaPipeline, EMPTY_ANSWER_RETRY_MESSAGE};
pub use types::{RagResponse, RagSourceRef};
