//! No-op memory service: disables long-term memory entirely.

use async_trait::async_trait;
use palaver_core::error::MemoryError;
use palaver_core::memory::{MemoryFetchRequest, MemoryService, RelatedContext, ScoredMemory};

/// A memory service that stores nothing and recalls nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryService for NoopMemory {
    fn name(&self) -> &str { "none" }

    async fn create_session(&self, _session_id: &str) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn store_turn(
        &self,
        _session_id: &str,
        _text: &str,
        _related_context: &[RelatedContext],
    ) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn fetch_relevant(
        &self,
        _session_id: &str,
        _request: &MemoryFetchRequest,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        Ok(Vec::new())
    }
}
