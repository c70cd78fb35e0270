//! Bounded conversation history.

use palaver_core::error::{Error, Result};
use palaver_core::message::{Message, Role};

/// Smallest usable capacity: the system message plus one other.
pub const MIN_CAPACITY: usize = 2;

/// Ordered message history with a fixed capacity.
///
/// Position 0 always holds the system message and is never evicted. When an
/// append would exceed the capacity, the oldest non-system message (position 1)
/// is dropped first.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
    capacity: usize,
}

impl ConversationBuffer {
    /// Create a buffer whose sole entry is the system prompt.
    pub fn new(system_prompt: impl Into<String>, capacity: usize) -> Result<Self> {
        if capacity < MIN_CAPACITY {
            return Err(Error::InvalidCapacity(capacity));
        }
        let mut messages = Vec::with_capacity(capacity);
        messages.push(Message::system(system_prompt));
        Ok(Self { messages, capacity })
    }

    /// Append a message, evicting position 1 first if the buffer is full.
    pub fn append(&mut self, message: Message) {
        if self.messages.len() + 1 > self.capacity {
            let evicted = self.messages.remove(1);
            tracing::trace!(role = %evicted.role, "Evicted oldest message");
        }
        self.messages.push(message);
    }

    /// The full history, in order, for submission to the completion service.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Overwrite the system message's content. Never evicts.
    pub fn replace_system_content(&mut self, content: impl Into<String>) {
        self.messages[0].content = content.into();
    }

    pub fn system_content(&self) -> &str {
        &self.messages[0].content
    }

    /// Up to `n` of the most recent non-system messages, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let history = &self.messages[1..];
        &history[history.len().saturating_sub(n)..]
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.role != Role::System)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the system message is permanent.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(buf: &ConversationBuffer) -> Vec<&str> {
        buf.snapshot().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn starts_with_system_prompt() {
        let buf = ConversationBuffer::new("S", 4).unwrap();
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.snapshot()[0].role, Role::System);
        assert!(buf.last().is_none());
    }

    #[test]
    fn capacity_below_two_rejected() {
        assert!(matches!(ConversationBuffer::new("S", 1), Err(Error::InvalidCapacity(1))));
        assert!(matches!(ConversationBuffer::new("S", 0), Err(Error::InvalidCapacity(0))));
        assert!(ConversationBuffer::new("S", 2).is_ok());
    }

    #[test]
    fn eviction_scenario_capacity_three() {
        let mut buf = ConversationBuffer::new("S", 3).unwrap();
        buf.append(Message::user("A"));
        assert_eq!(contents(&buf), vec!["S", "A"]);
        buf.append(Message::assistant("B"));
        assert_eq!(contents(&buf), vec!["S", "A", "B"]);
        buf.append(Message::user("C"));
        assert_eq!(contents(&buf), vec!["S", "B", "C"]);
    }

    #[test]
    fn capacity_two_keeps_only_latest() {
        let mut buf = ConversationBuffer::new("S", 2).unwrap();
        for text in ["a", "b", "c"] {
            buf.append(Message::user(text));
        }
        assert_eq!(contents(&buf), vec!["S", "c"]);
    }

    #[test]
    fn bounded_for_long_sequences() {
        let mut buf = ConversationBuffer::new("S", 5).unwrap();
        for i in 0..50 {
            buf.append(Message::user(i.to_string()));
            assert!(buf.len() <= buf.capacity());
            assert_eq!(buf.snapshot()[0].role, Role::System);
        }
        assert_eq!(contents(&buf), vec!["S", "46", "47", "48", "49"]);
    }

    #[test]
    fn replacing_system_content_never_evicts() {
        let mut buf = ConversationBuffer::new("S", 2).unwrap();
        buf.append(Message::user("A"));
        buf.replace_system_content("S + memories");
        assert_eq!(contents(&buf), vec!["S + memories", "A"]);
        assert_eq!(buf.system_content(), "S + memories");
    }

    #[test]
    fn recent_excludes_system() {
        let mut buf = ConversationBuffer::new("S", 10).unwrap();
        assert!(buf.recent(2).is_empty());
        buf.append(Message::user("A"));
        assert_eq!(buf.recent(2).len(), 1);
        buf.append(Message::assistant("B"));
        buf.append(Message::user("C"));
        let recent: Vec<_> = buf.recent(2).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(recent, vec!["B", "C"]);
    }
}
