//! Bounded conversation buffer

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One question and the answer given to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

impl ChatTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Conversation history shared by all conversational queries.
///
/// Holds at most `max_turns` turns; the oldest turn is dropped first.
pub struct ConversationMemory {
    turns: RwLock<VecDeque<ChatTurn>>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: RwLock::new(VecDeque::new()),
            max_turns: max_turns.max(1),
        }
    }

    pub fn push(&self, turn: ChatTurn) {
        let mut turns = self.turns.write();
        while turns.len() >= self.max_turns {
            turns.pop_front();
        }
        turns.push_back(turn);
    }

    /// Snapshot of the history, oldest first
    pub fn history(&self) -> Vec<ChatTurn> {
        self.turns.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.read().is_empty()
    }

    pub fn clear(&self) {
        self.turns.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bounded() {
        let memory = ConversationMemory::new(2);
        memory.push(ChatTurn::new("q1", "a1"));
        memory.push(ChatTurn::new("q2", "a2"));
        memory.push(ChatTurn::new("q3", "a3"));

        let history = memory.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "q2");
        assert_eq!(history[1].question, "q3");
    }

    #[test]
    fn test_clear() {
        let memory = ConversationMemory::new(5);
        memory.push(ChatTurn::new("q", "a"));
        assert!(!memory.is_empty());
        memory.clear();
        assert!(memory.is_empty());
    }
}
