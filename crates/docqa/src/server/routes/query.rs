//! Question answering endpoints

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{MessageResponse, QueryRequest, QueryResponse, SourceRef};

/// POST /query/ - Answer a question from the indexed documents
pub async fn query_documents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    let agent = state.agent()?;

    tracing::info!(
        "Query: \"{}\" (conversation: {})",
        request.question,
        request.use_conversation
    );

    let result = agent
        .query(&request.question, request.use_conversation)
        .await?;

    let sources = result
        .sources
        .iter()
        .map(|r| SourceRef::preview(&r.chunk.content, &r.chunk.metadata))
        .collect();

    Ok(Json(QueryResponse {
        answer: result.answer,
        sources,
        processing_time: start.elapsed().as_secs_f64(),
    }))
}

/// POST /clear_memory/ - Forget the conversation history
pub async fn clear_memory(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.agent()?.clear_memory();
    Ok(Json(MessageResponse::new("Conversation memory cleared")))
}
