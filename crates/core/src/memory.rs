//! Memory service trait: long-term recall across sessions.
//!
//! The memory service is an external store keyed by session. Each user turn
//! is submitted with a little surrounding context, and before every model
//! call the most relevant prior memories are fetched and rendered into the
//! system prompt.
//!
//! Every operation returns a `Result`; callers decide whether a failure
//! matters (the turn engine treats all of them as best-effort).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;

/// A message that surrounded a stored turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedContext {
    /// Who said it ("user", "assistant", "tool")
    pub speaker: String,

    /// What was said
    pub text: String,
}

impl RelatedContext {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// A memory returned by a relevance fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMemory {
    /// The remembered text
    pub text: String,

    /// When the memory was created
    pub created_at: DateTime<Utc>,

    /// Context captured alongside the memory
    #[serde(default)]
    pub related_context: Vec<RelatedContext>,
}

/// Parameters of a relevance fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFetchRequest {
    /// The text to find memories for
    pub query_text: String,

    /// Maximum number of memories to return
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Candidate pool size for the vector search stage
    #[serde(default = "default_vector_search_limit")]
    pub vector_search_limit: usize,

    /// Minimum similarity for a vector search candidate
    #[serde(default = "default_vector_search_threshold")]
    pub vector_search_threshold: f32,

    /// Minimum score for promotion to long-term memory
    #[serde(default = "default_long_term_threshold")]
    pub long_term_threshold: f32,
}

fn default_result_limit() -> usize {
    2
}
fn default_vector_search_limit() -> usize {
    10
}
fn default_vector_search_threshold() -> f32 {
    0.4
}
fn default_long_term_threshold() -> f32 {
    0.6
}

impl MemoryFetchRequest {
    /// A request for `query_text` with default limits and thresholds.
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            result_limit: default_result_limit(),
            vector_search_limit: default_vector_search_limit(),
            vector_search_threshold: default_vector_search_threshold(),
            long_term_threshold: default_long_term_threshold(),
        }
    }
}

/// The core MemoryService trait.
///
/// Implementations: HTTP service client, in-memory (for testing), none (no-op).
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// The backend name (e.g., "http", "in_memory", "none").
    fn name(&self) -> &str;

    /// Register a session. Called once at startup.
    async fn create_session(&self, session_id: &str) -> std::result::Result<(), MemoryError>;

    /// Store one user turn with the messages that preceded it.
    async fn store_turn(
        &self,
        session_id: &str,
        text: &str,
        related_context: &[RelatedContext],
    ) -> std::result::Result<(), MemoryError>;

    /// Fetch memories relevant to the request's query text.
    async fn fetch_relevant(
        &self,
        session_id: &str,
        request: &MemoryFetchRequest,
    ) -> std::result::Result<Vec<ScoredMemory>, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_request_defaults() {
        let req = MemoryFetchRequest::new("what did I say yesterday?");
        assert_eq!(req.result_limit, 2);
        assert_eq!(req.vector_search_limit, 10);
        assert!((req.vector_search_threshold - 0.4).abs() < f32::EPSILON);
        assert!((req.long_term_threshold - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn scored_memory_missing_context_defaults_empty() {
        let json = r#"{"text":"likes tea","created_at":"2026-01-02T03:04:05Z"}"#;
        let mem: ScoredMemory = serde_json::from_str(json).unwrap();
        assert_eq!(mem.text, "likes tea");
        assert!(mem.related_context.is_empty());
    }
}
