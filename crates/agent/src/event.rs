//! Turn-level streaming events.
//!
//! `TurnEvent` lifts provider chunks and tool activity into events a caller
//! can render while a turn is still running:
//! - `chunk`: partial text from the model
//! - `tool_call`: a tool is about to run
//! - `tool_result`: the tool finished (or failed)
//! - `round_completed`: one query/response cycle ended
//! - `done`: the turn is resolved

use palaver_core::message::ToolArguments;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Partial text from the model.
    Chunk { content: String },

    /// The engine is calling a tool.
    ToolCall {
        id: String,
        name: String,
        arguments: ToolArguments,
    },

    /// Tool dispatch completed. `success` is false when `output` is a diagnostic.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// A round finished; `round` counts from 1.
    RoundCompleted { round: usize, tool_calls: usize },

    /// The turn is complete.
    Done {
        session_id: String,
        rounds: usize,
        tool_calls_made: usize,
        exhausted: bool,
    },
}

impl TurnEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::RoundCompleted { .. } => "round_completed",
            Self::Done { .. } => "done",
        }
    }
}
