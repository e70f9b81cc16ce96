//! Question answering agent with optional conversation memory

mod memory;
mod prompt;
mod qa;

pub use memory::{ChatTurn, ConversationMemory};
pub use prompt::PromptBuilder;
pub use qa::{AgentAnswer, QaAgent, NOT_FOUND_ANSWER};
