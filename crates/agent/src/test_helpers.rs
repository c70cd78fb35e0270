//! Shared test doubles for engine tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use palaver_core::error::{MemoryError, ProviderError};
use palaver_core::memory::{MemoryFetchRequest, MemoryService, RelatedContext, ScoredMemory};
use palaver_core::message::{Message, ToolArguments, ToolCallRequest};
use palaver_core::provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type Script = Result<Vec<Result<StreamChunk, ProviderError>>, ProviderError>;

/// A provider that streams scripted chunks, one script per call.
///
/// Panics if called more often than it has scripts, unless built with
/// `always`, which repeats one script forever.
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    repeat: Option<Vec<StreamChunk>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(rounds: Vec<Vec<StreamChunk>>) -> Self {
        Self::from_results(
            rounds
                .into_iter()
                .map(|chunks| chunks.into_iter().map(Ok).collect())
                .collect(),
        )
    }

    /// Scripts that may fail part-way through a stream.
    pub fn from_results(rounds: Vec<Vec<Result<StreamChunk, ProviderError>>>) -> Self {
        Self {
            scripts: Mutex::new(rounds.into_iter().map(Ok).collect()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first call outright, then play `rounds`.
    pub fn with_failure_first(error: ProviderError, rounds: Vec<Vec<StreamChunk>>) -> Self {
        let provider = Self::new(rounds);
        provider.scripts.lock().unwrap().push_front(Err(error));
        provider
    }

    /// Answer every call with the same chunks.
    pub fn always(chunks: Vec<StreamChunk>) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            repeat: Some(chunks),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_script(&self) -> Script {
        if let Some(script) = self.scripts.lock().unwrap().pop_front() {
            return script;
        }
        match &self.repeat {
            Some(chunks) => Ok(chunks.iter().cloned().map(Ok).collect()),
            None => panic!("ScriptedProvider: no more scripts (call #{})", self.call_count()),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        let mut rx = self.stream(request).await?;
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            content.push_str(chunk.content.as_deref().unwrap_or_default());
            tool_calls.extend(chunk.tool_calls);
        }
        Ok(ProviderResponse {
            message: Message::assistant_with_calls(content, tool_calls),
            model,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let chunks = self.next_script()?;

        let (tx, rx) = tokio::sync::mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            let _ = tx.send(chunk).await;
        }
        Ok(rx)
    }
}

/// A memory service that records what it is given and returns canned memories.
pub struct RecordingMemory {
    memories: Mutex<Vec<ScoredMemory>>,
    stored: Mutex<Vec<(String, Vec<RelatedContext>)>>,
    queries: Mutex<Vec<MemoryFetchRequest>>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingMemory {
    pub fn new() -> Self {
        Self {
            memories: Mutex::new(Vec::new()),
            stored: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            fail: false,
            delay: None,
        }
    }

    /// Every call fails with `Unavailable`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_memories(self, memories: Vec<ScoredMemory>) -> Self {
        self.set_memories(memories);
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_memories(&self, memories: Vec<ScoredMemory>) {
        *self.memories.lock().unwrap() = memories;
    }

    pub fn stored(&self) -> Vec<(String, Vec<RelatedContext>)> {
        self.stored.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<MemoryFetchRequest> {
        self.queries.lock().unwrap().clone()
    }

    async fn gate(&self) -> Result<(), MemoryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(MemoryError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryService for RecordingMemory {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_session(&self, _session_id: &str) -> Result<(), MemoryError> {
        self.gate().await
    }

    async fn store_turn(
        &self,
        _session_id: &str,
        text: &str,
        related_context: &[RelatedContext],
    ) -> Result<(), MemoryError> {
        self.gate().await?;
        self.stored
            .lock()
            .unwrap()
            .push((text.to_string(), related_context.to_vec()));
        Ok(())
    }

    async fn fetch_relevant(
        &self,
        _session_id: &str,
        request: &MemoryFetchRequest,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        self.gate().await?;
        self.queries.lock().unwrap().push(request.clone());
        Ok(self.memories.lock().unwrap().clone())
    }
}

pub fn done_chunk() -> StreamChunk {
    StreamChunk {
        done: true,
        ..StreamChunk::default()
    }
}

pub fn tool_chunk(calls: Vec<ToolCallRequest>) -> StreamChunk {
    StreamChunk {
        tool_calls: calls,
        ..StreamChunk::default()
    }
}

pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    let arguments: ToolArguments = args.as_object().cloned().unwrap_or_default();
    ToolCallRequest::new(id, name, arguments)
}

pub fn memory_fixture(text: &str) -> ScoredMemory {
    ScoredMemory {
        text: text.into(),
        created_at: Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap(),
        related_context: Vec::new(),
    }
}
