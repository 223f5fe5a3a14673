//! Prompt types for ManualQA.

use serde::{Deserialize, Serialize};

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Template identifier
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Number of passages placed in the context block
    #[serde(rename = "passageCount")]
    pub passage_count: usize,

    /// Length of the context block in characters
    #[serde(rename = "contextChars")]
    pub context_chars: usize,

    /// Phrase the model is told to emit when the context lacks the answer
    pub sentinel: String,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: impl Into<String>,
        passage_count: usize,
        context_chars: usize,
        sentinel: impl Into<String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id: source_prompt_id.into(),
                passage_count,
                context_chars,
                sentinel: sentinel.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serialization() {
        let built = BuiltPrompt::new(None, "body".to_string(), "qa", 2, 40, "nope");
        let json = serde_json::to_value(&built).unwrap();

        assert_eq!(json["metadata"]["sourcePromptId"], "qa");
        assert_eq!(json["metadata"]["passageCount"], 2);
        assert_eq!(json["metadata"]["contextChars"], 40);
        assert_eq!(json["metadata"]["sentinel"], "nope");
        assert!(json["system"].is_null());
    }
}
