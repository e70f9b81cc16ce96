//! Retrieval-augmented question answering

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider, VectorSearchResult, VectorStoreProvider};

use super::memory::{ChatTurn, ConversationMemory};
use super::prompt::PromptBuilder;

/// Answer returned when retrieval finds nothing to ground on
pub const NOT_FOUND_ANSWER: &str =
    "I couldn't find relevant information in the uploaded documents to answer this question.";

/// Answer plus the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct AgentAnswer {
    pub answer: String,
    pub sources: Vec<VectorSearchResult>,
}

/// Question answering over the vector store
pub struct QaAgent {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    /// Chunks retrieved per question
    k: usize,
    memory: ConversationMemory,
}

impl QaAgent {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        llm: Arc<dyn LlmProvider>,
        k: usize,
        max_turns: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            k,
            memory: ConversationMemory::new(max_turns),
        }
    }

    /// Answer `question` from the indexed documents.
    ///
    /// With `use_conversation`, a follow-up is first rewritten into a
    /// standalone question using the remembered turns, and the new turn is
    /// remembered afterwards.
    pub async fn query(&self, question: &str, use_conversation: bool) -> Result<AgentAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::BadRequest("Question must not be empty".to_string()));
        }

        let start = Instant::now();
        let history = if use_conversation {
            self.memory.history()
        } else {
            Vec::new()
        };

        let search_question = if history.is_empty() {
            question.to_string()
        } else {
            self.condense(question, &history).await?
        };

        let query_embedding = self.embedder.embed(&search_question).await?;
        let sources = self.store.search(&query_embedding, self.k).await?;
        tracing::debug!(
            "Retrieved {} chunks for \"{}\"",
            sources.len(),
            search_question
        );

        let answer = if sources.is_empty() {
            NOT_FOUND_ANSWER.to_string()
        } else {
            let context = PromptBuilder::build_context(&sources);
            let prompt = if use_conversation {
                PromptBuilder::build_conversational_prompt(question, &context, &history)
            } else {
                PromptBuilder::build_qa_prompt(question, &context)
            };
            self.llm.complete(&prompt).await?.trim().to_string()
        };

        if use_conversation {
            self.memory.push(ChatTurn::new(question, answer.clone()));
        }

        tracing::info!(
            "Answered in {:?} ({} sources, conversation: {})",
            start.elapsed(),
            sources.len(),
            use_conversation
        );

        Ok(AgentAnswer { answer, sources })
    }

    /// Forget the conversation history
    pub fn clear_memory(&self) {
        self.memory.clear();
        tracing::info!("Conversation memory cleared");
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    async fn condense(&self, question: &str, history: &[ChatTurn]) -> Result<String> {
        let prompt = PromptBuilder::build_condense_prompt(question, history);
        let standalone = self.llm.complete(&prompt).await?;
        let standalone = standalone.trim();
        if standalone.is_empty() {
            return Ok(question.to_string());
        }
        tracing::debug!("Condensed \"{}\" to \"{}\"", question, standalone);
        Ok(standalone.to_string())
    }
}
