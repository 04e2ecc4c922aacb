//! LLM completion capability (spec.md §6, consumed by C7).

mod provider;

pub use provider::{ChatMessage, ClaudeProvider, GeminiProvider, LlmError, LlmProvider, StreamChunk};

#[cfg(test)]
pub use provider::test_support;
