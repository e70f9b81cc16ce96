//! Prompt templates for grounded answering

use crate::providers::VectorSearchResult;

use super::memory::ChatTurn;

/// Prompt builder for QA and follow-up condensing
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts, separated by blank lines
    pub fn build_context(results: &[VectorSearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Grounded answer prompt over the retrieved context
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            "Use the following pieces of context to answer the question at the end. \
             If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
             Context: {context}\n\n\
             Question: {question}\n\n\
             Answer:"
        )
    }

    /// Same as [`build_qa_prompt`](Self::build_qa_prompt) with earlier turns prepended
    pub fn build_conversational_prompt(question: &str, context: &str, history: &[ChatTurn]) -> String {
        if history.is_empty() {
            return Self::build_qa_prompt(question, context);
        }
        format!(
            "Use the following pieces of context and the conversation so far to answer the question at the end. \
             If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
             Conversation:\n{history}\n\n\
             Context: {context}\n\n\
             Question: {question}\n\n\
             Answer:",
            history = Self::format_history(history)
        )
    }

    /// Ask the model to rewrite a follow-up as a standalone question
    pub fn build_condense_prompt(question: &str, history: &[ChatTurn]) -> String {
        format!(
            "Given the following conversation and a follow up question, rephrase the follow up question \
             to be a standalone question, in its original language.\n\n\
             Chat History:\n{history}\n\
             Follow Up Input: {question}\n\
             Standalone question:",
            history = Self::format_history(history)
        )
    }

    fn format_history(history: &[ChatTurn]) -> String {
        history
            .iter()
            .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
