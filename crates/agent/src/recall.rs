//! Rendering recalled memories into the system prompt.

use palaver_core::memory::ScoredMemory;
use std::fmt::Write;

pub const MEMORY_HEADER: &str = "These are memories of previous conversation you have had with the user:";

/// Render memories as a prompt block. Empty input renders as an empty string.
pub fn render_memories(memories: &[ScoredMemory]) -> String {
    if memories.is_empty() {
        return String::new();
    }

    let mut out = String::from(MEMORY_HEADER);
    out.push('\n');
    for (i, mem) in memories.iter().enumerate() {
        let _ = writeln!(out, "{}:", i + 1);
        let _ = writeln!(
            out,
            "\tThis memory was created on **{}**",
            mem.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if !mem.related_context.is_empty() {
            out.push_str("Context related with the memory:\n");
            for ctx in &mem.related_context {
                let _ = writeln!(out, "{}: {}", ctx.speaker, ctx.text);
            }
        }
        let _ = writeln!(out, "The actual memory:*{}*", mem.text);
    }
    out
}

/// The system prompt for a turn: the base prompt, plus the memory block if
/// there is one. Each call starts again from `base`.
pub fn system_prompt_with(base: &str, memories: &[ScoredMemory]) -> String {
    let block = render_memories(memories);
    if block.is_empty() {
        base.to_string()
    } else {
        format!("{base}\n\n{block}")
    }
}
