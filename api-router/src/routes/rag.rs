use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RagRequest {
    pub question: String,
    pub knowledge_base: String,
}

#[derive(Debug, Serialize)]
pub struct RagResponse {
    pub context: String,
    pub files_used: Vec<String>,
}

/// Run retrieval alone: the context and source files the chat endpoint
/// would build its prompt from.
pub async fn run_rag(
    State(state): State<ApiState>,
    Json(input): Json<RagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if input.question.trim().is_empty() {
        return Err(ApiError::ValidationError("question must not be empty".to_string()));
    }

    info!(knowledge_base = %input.knowledge_base, "Received rag request");

    let result = retrieval_pipeline::retrieve(
        &state.pipeline.kb_cache,
        &state.pipeline.scorer,
        &input.question,
        &input.knowledge_base,
        1,
    )
    .await?;

    Ok(Json(RagResponse {
        files_used: result.file_names(),
        context: result.context,
    }))
}
