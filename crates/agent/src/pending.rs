//! Tool results collected during one round.

use palaver_core::message::{Message, ToolCallRequest};

/// A tool call paired with the text it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallOutcome {
    pub request: ToolCallRequest,
    pub result: String,
}

/// Accumulates `(call, result)` pairs in recording order.
#[derive(Debug, Default)]
pub struct PendingToolResults {
    outcomes: Vec<ToolCallOutcome>,
}

impl PendingToolResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.outcomes.clear();
    }

    /// Make room for `additional` outcomes.
    pub fn reserve(&mut self, additional: usize) {
        self.outcomes.reserve(additional);
    }

    pub fn record(&mut self, request: ToolCallRequest, result: impl Into<String>) {
        self.outcomes.push(ToolCallOutcome {
            request,
            result: result.into(),
        });
    }

    pub fn has_pending(&self) -> bool {
        !self.outcomes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// The requests, in recording order, for the assistant message that issued them.
    pub fn original_requests(&self) -> Vec<ToolCallRequest> {
        self.outcomes.iter().map(|o| o.request.clone()).collect()
    }

    /// Take every outcome as a tool-role message, in recording order.
    pub fn drain_as_tool_messages(&mut self) -> Vec<Message> {
        self.outcomes
            .drain(..)
            .map(|o| Message::tool_result(&o.request, o.result))
            .collect()
    }
}
