//! In-memory memory service: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use palaver_core::error::MemoryError;
use palaver_core::memory::{MemoryFetchRequest, MemoryService, RelatedContext, ScoredMemory};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A memory service that keeps every stored turn in a per-session Vec.
///
/// Relevance is the fraction of query words that appear in the stored text,
/// so "green tea" scores 0.5 against "I like tea".
pub struct InMemoryService {
    sessions: Arc<RwLock<HashMap<String, Vec<ScoredMemory>>>>,
}

impl InMemoryService {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of turns stored for `session_id`.
    pub async fn count(&self, session_id: &str) -> usize {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map_or(0, |turns| turns.len())
    }

    /// Everything stored for `session_id`, in insertion order.
    pub async fn stored(&self, session_id: &str) -> Vec<ScoredMemory> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new()
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn relevance(query: &HashSet<String>, text: &str) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let candidate = words(text);
    let hits = query.iter().filter(|w| candidate.contains(*w)).count();
    hits as f32 / query.len() as f32
}

#[async_trait]
impl MemoryService for InMemoryService {
    fn name(&self) -> &str { "in_memory" }

    async fn create_session(&self, session_id: &str) -> Result<(), MemoryError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default();
        Ok(())
    }

    async fn store_turn(
        &self,
        session_id: &str,
        text: &str,
        related_context: &[RelatedContext],
    ) -> Result<(), MemoryError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(ScoredMemory {
                text: text.to_string(),
                created_at: Utc::now(),
                related_context: related_context.to_vec(),
            });
        Ok(())
    }

    async fn fetch_relevant(
        &self,
        session_id: &str,
        request: &MemoryFetchRequest,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        let sessions = self.sessions.read().await;
        let Some(turns) = sessions.get(session_id) else {
            return Ok(Vec::new());
        };

        let query = words(&request.query_text);
        let mut scored: Vec<(f32, &ScoredMemory)> = turns
            .iter()
            .map(|m| (relevance(&query, &m.text), m))
            .filter(|(score, _)| *score > 0.0 && *score >= request.vector_search_threshold)
            .collect();

        // Stable sort keeps older memories first among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(request.result_limit);

        Ok(scored.into_iter().map(|(_, m)| m.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> MemoryFetchRequest {
        MemoryFetchRequest::new(text)
    }

    #[tokio::test]
    async fn store_and_count() {
        let mem = InMemoryService::new();
        mem.create_session("s1").await.unwrap();
        assert_eq!(mem.count("s1").await, 0);

        mem.store_turn("s1", "Rust is a systems language", &[]).await.unwrap();
        assert_eq!(mem.count("s1").await, 1);
        assert_eq!(mem.count("other").await, 0);
    }

    #[tokio::test]
    async fn fetch_by_keyword() {
        let mem = InMemoryService::new();
        mem.store_turn("s1", "I drink green tea every morning", &[]).await.unwrap();
        mem.store_turn("s1", "Python is great for scripting", &[]).await.unwrap();
        mem.store_turn("s1", "JavaScript runs in the browser", &[]).await.unwrap();

        let results = mem.fetch_relevant("s1", &request("green tea")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("tea"));
    }

    #[tokio::test]
    async fn threshold_filters_weak_matches() {
        let mem = InMemoryService::new();
        mem.store_turn("s1", "tea", &[]).await.unwrap();

        // One of three words matches: 0.33 < 0.4
        let results = mem.fetch_relevant("s1", &request("tea or coffee")).await.unwrap();
        assert!(results.is_empty());

        let mut lenient = request("tea or coffee");
        lenient.vector_search_threshold = 0.3;
        assert_eq!(mem.fetch_relevant("s1", &lenient).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn results_ranked_and_limited() {
        let mem = InMemoryService::new();
        mem.store_turn("s1", "meeting on monday", &[]).await.unwrap();
        mem.store_turn("s1", "dentist meeting on monday morning", &[]).await.unwrap();
        mem.store_turn("s1", "monday", &[]).await.unwrap();

        let results = mem
            .fetch_relevant("s1", &request("dentist meeting monday"))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "dentist meeting on monday morning");
        assert_eq!(results[1].text, "meeting on monday");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let mem = InMemoryService::new();
        mem.store_turn("alice", "my cat is called Miso", &[]).await.unwrap();

        let results = mem.fetch_relevant("bob", &request("cat Miso")).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn related_context_is_kept() {
        let mem = InMemoryService::new();
        let ctx = [RelatedContext::new("assistant", "What is your cat called?")];
        mem.store_turn("s1", "Miso", &ctx).await.unwrap();

        let stored = mem.stored("s1").await;
        assert_eq!(stored[0].related_context, ctx.to_vec());
    }
}
