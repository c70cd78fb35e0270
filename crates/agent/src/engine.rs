//! The turn engine: one user input in, one stable assistant reply out.

use crate::accumulator::ResponseAccumulator;
use crate::buffer::ConversationBuffer;
use crate::event::TurnEvent;
use crate::pending::PendingToolResults;
use crate::recall::system_prompt_with;
use crate::session::Session;
use palaver_config::AppConfig;
use palaver_core::error::{MemoryError, Result};
use palaver_core::memory::{MemoryFetchRequest, RelatedContext, ScoredMemory};
use palaver_core::message::{Message, ToolCallRequest};
use palaver_core::provider::ProviderRequest;
use palaver_core::tool::ToolRegistry;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Messages sent to the memory service as context for a stored turn.
const RELATED_CONTEXT_MESSAGES: usize = 2;

/// What a resolved turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Text of the last assistant message
    pub reply: String,

    /// Query/response cycles used
    pub rounds: usize,

    /// Tool calls dispatched across all rounds
    pub tool_calls: usize,

    /// True when the round limit ended the turn while tool results were
    /// still being fed back
    pub exhausted: bool,
}

/// Drives a conversation one user turn at a time.
///
/// Each turn stores the input in long-term memory, refreshes the system
/// prompt with recalled memories, then queries the completion service until
/// it answers without tool calls or `max_rounds` is reached.
pub struct TurnEngine {
    session: Session,
    buffer: ConversationBuffer,
    pending: PendingToolResults,
    accumulator: ResponseAccumulator,
    base_prompt: String,
    max_rounds: usize,
    memory_timeout: Duration,
    fetch: MemoryFetchRequest,
}

impl TurnEngine {
    pub fn new(session: Session, system_prompt: impl Into<String>, capacity: usize) -> Result<Self> {
        let base_prompt = system_prompt.into();
        Ok(Self {
            buffer: ConversationBuffer::new(base_prompt.clone(), capacity)?,
            session,
            pending: PendingToolResults::new(),
            accumulator: ResponseAccumulator::new(),
            base_prompt,
            max_rounds: 5,
            memory_timeout: Duration::from_secs(5),
            fetch: MemoryFetchRequest::new(""),
        })
    }

    /// Build an engine from the `[conversation]` and `[memory]` sections.
    pub fn from_config(session: Session, config: &AppConfig) -> Result<Self> {
        let conversation = &config.conversation;
        Ok(Self::new(session, conversation.system_prompt.clone(), conversation.capacity)?
            .with_max_rounds(conversation.max_rounds)
            .with_memory_timeout(Duration::from_secs(config.memory.timeout_secs))
            .with_fetch_params(palaver_memory::fetch_request(&config.memory, "")))
    }

    /// Set the round limit per turn. Values below 1 are raised to 1.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Bound each memory store and fetch by `timeout`.
    pub fn with_memory_timeout(mut self, timeout: Duration) -> Self {
        self.memory_timeout = timeout;
        self
    }

    /// Limits and thresholds for memory fetches. The query text is ignored.
    pub fn with_fetch_params(mut self, fetch: MemoryFetchRequest) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Resolve one user turn.
    pub async fn resolve(&mut self, text: &str) -> Result<TurnOutcome> {
        self.run_turn(text, None).await
    }

    /// Resolve one user turn, reporting progress on `events` as it happens.
    pub async fn resolve_streaming(
        &mut self,
        text: &str,
        events: &UnboundedSender<TurnEvent>,
    ) -> Result<TurnOutcome> {
        self.run_turn(text, Some(events)).await
    }

    async fn run_turn(&mut self, text: &str, events: Option<&UnboundedSender<TurnEvent>>) -> Result<TurnOutcome> {
        info!(session_id = %self.session.id, chars = text.len(), "Resolving turn");

        self.pending.reset();
        let related: Vec<RelatedContext> = self
            .buffer
            .recent(RELATED_CONTEXT_MESSAGES)
            .iter()
            .map(|m| RelatedContext::new(m.role.as_str(), m.content.clone()))
            .collect();
        self.buffer.append(Message::user(text));

        let memories = self.exchange_memories(text, &related).await;
        let system = system_prompt_with(&self.base_prompt, &memories);
        self.buffer.replace_system_content(system);

        let definitions = self.session.tools.definitions();
        let mut can_proceed = false;
        let mut rounds = 0;
        let mut tool_calls_made = 0;

        while (self.pending.has_pending() || !can_proceed) && rounds < self.max_rounds {
            self.accumulator.reset();
            debug!(session_id = %self.session.id, round = rounds + 1, "Querying completion service");

            let request = ProviderRequest {
                model: self.session.model.clone(),
                messages: self.buffer.snapshot().to_vec(),
                temperature: self.session.temperature,
                tools: definitions.clone(),
                stream: true,
            };
            let mut chunks = self.session.provider.stream(request).await?;

            while let Some(chunk) = chunks.recv().await {
                let chunk = chunk?;

                if let Some(content) = chunk.content.as_deref()
                    && !content.is_empty()
                {
                    self.accumulator.push(content);
                    emit(events, TurnEvent::Chunk {
                        content: content.to_string(),
                    });
                }

                if !chunk.tool_calls.is_empty() {
                    self.pending.reserve(chunk.tool_calls.len());
                    for call in chunk.tool_calls {
                        let result = dispatch(&self.session.tools, &call, events).await;
                        self.pending.record(call, result);
                        tool_calls_made += 1;
                    }
                }

                if chunk.done {
                    break;
                }
            }

            let requested = self.pending.original_requests();
            let round_calls = requested.len();
            self.buffer
                .append(Message::assistant_with_calls(self.accumulator.as_str(), requested));

            if self.pending.has_pending() {
                for message in self.pending.drain_as_tool_messages() {
                    self.buffer.append(message);
                }
                self.pending.reset();
            } else {
                can_proceed = true;
            }

            rounds += 1;
            emit(events, TurnEvent::RoundCompleted {
                round: rounds,
                tool_calls: round_calls,
            });
        }

        let exhausted = !can_proceed;
        if exhausted {
            warn!(
                session_id = %self.session.id,
                rounds,
                max_rounds = self.max_rounds,
                "Round limit reached before a final answer"
            );
        }

        emit(events, TurnEvent::Done {
            session_id: self.session.id.clone(),
            rounds,
            tool_calls_made,
            exhausted,
        });

        info!(session_id = %self.session.id, rounds, tool_calls = tool_calls_made, "Turn resolved");

        Ok(TurnOutcome {
            reply: self.accumulator.as_str().to_string(),
            rounds,
            tool_calls: tool_calls_made,
            exhausted,
        })
    }

    /// Store the turn and fetch memories for it, concurrently and each under
    /// the memory timeout. Failures are logged and yield no memories.
    async fn exchange_memories(&self, text: &str, related: &[RelatedContext]) -> Vec<ScoredMemory> {
        let memory = &self.session.memory;
        let session_id = self.session.id.as_str();
        let fetch = MemoryFetchRequest {
            query_text: text.to_string(),
            ..self.fetch.clone()
        };

        // The fetch is polled first so a backend that answers immediately
        // never recalls the turn being stored
        let (fetched, stored) = tokio::join!(
            tokio::time::timeout(self.memory_timeout, memory.fetch_relevant(session_id, &fetch)),
            tokio::time::timeout(self.memory_timeout, memory.store_turn(session_id, text, related)),
        );

        if let Err(e) = self.bounded(stored) {
            warn!(session_id, backend = memory.name(), error = %e, "Failed to store turn in memory");
        }

        match self.bounded(fetched) {
            Ok(memories) => {
                if !memories.is_empty() {
                    debug!(session_id, count = memories.len(), "Recalled memories for context");
                }
                memories
            }
            Err(e) => {
                warn!(session_id, backend = memory.name(), error = %e, "Memory recall failed");
                Vec::new()
            }
        }
    }

    fn bounded<T>(
        &self,
        result: std::result::Result<std::result::Result<T, MemoryError>, tokio::time::error::Elapsed>,
    ) -> std::result::Result<T, MemoryError> {
        result.unwrap_or_else(|_| {
            Err(MemoryError::Timeout {
                timeout_ms: self.memory_timeout.as_millis() as u64,
            })
        })
    }
}

/// Run one tool call. Failures become diagnostic text for the model.
async fn dispatch(
    tools: &ToolRegistry,
    call: &ToolCallRequest,
    events: Option<&UnboundedSender<TurnEvent>>,
) -> String {
    emit(events, TurnEvent::ToolCall {
        id: call.id.clone(),
        name: call.name.clone(),
        arguments: call.arguments.clone(),
    });

    let start = std::time::Instant::now();
    let (output, success) = match tools.dispatch(&call.name, &call.arguments).await {
        Ok(output) => (output, true),
        Err(e) => {
            warn!(tool = %call.name, error = %e, "Tool call failed");
            (format!("Error calling tool {}: {e}", call.name), false)
        }
    };
    debug!(
        tool = %call.name,
        success,
        duration_ms = start.elapsed().as_millis() as u64,
        "Tool dispatched"
    );

    emit(events, TurnEvent::ToolResult {
        id: call.id.clone(),
        name: call.name.clone(),
        output: output.clone(),
        success,
    });
    output
}

fn emit(events: Option<&UnboundedSender<TurnEvent>>, event: TurnEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching
        let _ = tx.send(event);
    }
}
