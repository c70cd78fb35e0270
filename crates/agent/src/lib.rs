//! The turn engine: the heart of Palaver.
//!
//! A turn follows a **Store → Recall → Query → Dispatch** cycle:
//!
//! 1. **Append** the user message to the bounded conversation buffer
//! 2. **Store** the message in long-term memory and **recall** related
//!    memories into the system prompt (both best-effort)
//! 3. **Query** the completion service with the whole buffer, streamed
//! 4. **If tool calls**: dispatch them, fold the results back in, loop to 3
//! 5. **If text only**: the turn is resolved
//!
//! The loop ends when the model answers without tool calls or the round
//! limit is reached.

pub mod accumulator;
pub mod buffer;
pub mod engine;
pub mod event;
pub mod pending;
pub mod recall;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use accumulator::ResponseAccumulator;
pub use buffer::ConversationBuffer;
pub use engine::{TurnEngine, TurnOutcome};
pub use event::TurnEvent;
pub use pending::{PendingToolResults, ToolCallOutcome};
pub use recall::{render_memories, system_prompt_with};
pub use session::Session;
