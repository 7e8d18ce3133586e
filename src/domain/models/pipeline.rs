//! Pipeline invocation models

use serde::{Deserialize, Serialize};

use super::embedding::SearchResult;

/// Marker that precedes the answer in the prompt template
pub const ANSWER_MARKER: &str = "Answer:";

/// Raw output of one retrieval + generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Raw generated text (may include the prompt)
    pub result: String,

    /// Chunks the answer was conditioned on
    pub sources: Vec<SearchResult>,
}

impl PipelineOutput {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_sources(mut self, sources: Vec<SearchResult>) -> Self {
        self.sources = sources;
        self
    }
}

/// Extract the answer from a raw pipeline result.
///
/// Takes the text after the last `Answer:` marker, trimmed. Without a marker
/// the whole result is returned, trimmed.
pub fn extract_answer(raw: &str) -> String {
    raw.rsplit(ANSWER_MARKER)
        .next()
        .unwrap_or(raw)
        .trim()
        .to_string()
}
