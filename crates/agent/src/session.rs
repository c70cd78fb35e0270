//! Everything a conversation needs from the outside world.

use palaver_core::memory::MemoryService;
use palaver_core::provider::Provider;
use palaver_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// An explicitly constructed conversation context, handed to the `TurnEngine`.
#[derive(Clone)]
pub struct Session {
    /// Memory service key for this conversation
    pub id: String,

    /// Completion service
    pub provider: Arc<dyn Provider>,

    /// Tools the model may call; read-only once the session exists
    pub tools: Arc<ToolRegistry>,

    /// Long-term memory service
    pub memory: Arc<dyn MemoryService>,

    /// Model identifier sent with every request
    pub model: String,

    pub temperature: f32,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryService>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            tools,
            memory,
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Register the session with the memory service. Best-effort: returns
    /// whether it succeeded and logs the failure otherwise.
    pub async fn register(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.memory.create_session(&self.id)).await {
            Ok(Ok(())) => {
                debug!(session_id = %self.id, backend = self.memory.name(), "Session registered");
                true
            }
            Ok(Err(e)) => {
                warn!(session_id = %self.id, error = %e, "Memory session registration failed");
                false
            }
            Err(_) => {
                warn!(
                    session_id = %self.id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Memory session registration timed out"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("provider", &self.provider.name())
            .field("tools", &self.tools.names())
            .field("memory", &self.memory.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}
