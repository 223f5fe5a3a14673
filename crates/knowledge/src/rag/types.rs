//! Answer types returned to callers.

use crate::types::SearchHit;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum snippet length for source references, in characters.
pub const MAX_SNIPPET_CHARS: usize = 150;

/// Where part of an answer's context came from.
///
/// Chunk ids and scores stay internal; users see the file, a location and
/// a short excerpt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSourceRef {
    /// File name of the source document, e.g. "Administrator_Guide.pdf"
    pub source: String,

    /// Location within the source, e.g. "part 3"
    pub location: String,

    /// Start of the passage, truncated at a word boundary
    pub snippet: String,
}

/// One answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Text stored as the assistant turn
    pub answer: String,

    /// Passages used as context, de-duplicated, best first
    pub sources: Vec<RagSourceRef>,

    /// Highest similarity among the retrieved passages
    #[serde(skip_serializing, default)]
    pub max_score: f32,

    /// The model returned nothing and `answer` holds the retry message
    pub retry_substituted: bool,
}

impl RagResponse {
    pub fn new(answer: String, hits: &[SearchHit], retry_substituted: bool) -> Self {
        Self {
            answer,
            sources: map_hits_to_sources(hits),
            max_score: hits.first().map(|h| h.score).unwrap_or(0.0),
            retry_substituted,
        }
    }
}

/// Map search hits to source references, dropping repeats of the same location.
pub fn map_hits_to_sources(hits: &[SearchHit]) -> Vec<RagSourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for hit in hits {
        let source = file_name(&hit.chunk.source);
        let location = format!("part {}", hit.chunk.position + 1);

        if seen.insert((source.clone(), location.clone())) {
            sources.push(RagSourceRef {
                source,
                location,
                snippet: truncate_snippet(&hit.chunk.text, MAX_SNIPPET_CHARS),
            });
        }
    }

    sources
}

fn file_name(document_id: &str) -> String {
    document_id
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(document_id)
        .to_string()
}

/// Truncate to at most `max_chars` characters plus "...", preferring a word boundary.
fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(space) if space > 0 => format!("{}...", truncated[..space].trim_end()),
        _ => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn hit(id: usize, source: &str, position: usize, text: &str, score: f32) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                id,
                source: source.to_string(),
                position,
                text: text.to_string(),
            },
            score,
        }
    }

    #[test]
    fn test_response_from_hits() {
        let hits = vec![
            hit(4, "manuals/Administrator_Guide.pdf", 2, "Reset the device.", 0.9),
            hit(1, "Parameters_Guide.pdf", 0, "LED parameters.", 0.4),
        ];

        let response = RagResponse::new("Hold the button.".to_string(), &hits, false);
        assert_eq!(response.max_score, 0.9);
        assert!(!response.retry_substituted);
        assert_eq!(response.sources.len(), 2);
        assert_eq!(response.sources[0].source, "Administrator_Guide.pdf");
        assert_eq!(response.sources[0].location, "part 3");
        assert_eq!(response.sources[1].location, "part 1");
    }

    #[test]
    fn test_no_hits() {
        let response = RagResponse::new(String::new(), &[], true);
        assert_eq!(response.max_score, 0.0);
        assert!(response.sources.is_empty());
    }

    #[test]
    fn test_duplicate_locations_collapse() {
        let hits = vec![
            hit(0, "a.txt", 0, "same", 0.9),
            hit(0, "a.txt", 0, "same", 0.9),
            hit(1, "a.txt", 1, "other", 0.5),
        ];
        assert_eq!(map_hits_to_sources(&hits).len(), 2);
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("Short text", 100), "Short text");

        let long = "This is a very long text that needs to be truncated at some point";
        let result = truncate_snippet(long, 30);
        assert_eq!(result, "This is a very long text that...");
    }

    #[test]
    fn test_truncate_snippet_multibyte() {
        let text = "é".repeat(200);
        let result = truncate_snippet(&text, 150);
        assert_eq!(result.chars().count(), 153);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_serialization_hides_score() {
        let response = RagResponse::new("ok".to_string(), &[hit(0, "a.txt", 0, "x", 0.7)], false);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("max_score").is_none());
        assert_eq!(json["answer"], "ok");
        assert_eq!(json["sources"][0]["source"], "a.txt");
    }
}
