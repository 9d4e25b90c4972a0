use axum::{extract::State, response::IntoResponse, Json};
use chat_pipeline::{splitter::typing_delays, trending::refresh_trending, StageTimings};
use common::{
    error::AppError,
    storage::types::{
        chat_message::{ChatMessage, MessageRole, MessageSource, SourceScope},
        chat_session::ChatSession,
        error_event::ErrorEvent,
    },
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub knowledge_base: String,
    pub session_id: String,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub source: MessageSource,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub files_used: Vec<String>,
    pub message_parts: Vec<String>,
    pub performance: StageTimings,
    pub typing_delays: Vec<u64>,
    pub message_id: String,
}

/// The full exchange: RAG answer, staged delivery parts, persistence, and a
/// fire-and-forget trending refresh.
pub async fn chat(
    State(state): State<ApiState>,
    Json(input): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if input.question.trim().is_empty() {
        return Err(ApiError::ValidationError("question must not be empty".to_string()));
    }
    if input.session_id.trim().is_empty() {
        return Err(ApiError::ValidationError("session_id must not be empty".to_string()));
    }

    info!(
        session_id = %input.session_id,
        knowledge_base = %input.knowledge_base,
        "Received chat request"
    );

    let outcome = match state
        .pipeline
        .respond(
            &input.session_id,
            &input.question,
            &input.knowledge_base,
            input.model.as_deref(),
            input.max_tokens,
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(session_id = %input.session_id, "Chat request failed: {e}");
            ErrorEvent::record(
                &state.db,
                error_kind(&e),
                &e.to_string(),
                Some(&input.session_id),
            )
            .await;
            return Err(e.into());
        }
    };

    // Persist the exchange; the assistant message id is what feedback
    // references later.
    ChatSession::touch(&state.db, &input.session_id, input.source).await?;

    let user_message = ChatMessage::new(
        input.session_id.clone(),
        MessageRole::User,
        input.question.clone(),
        None,
        None,
        input.source,
    );
    state
        .db
        .store_item(user_message)
        .await
        .map_err(AppError::from)?;

    let assistant_message = ChatMessage::new(
        input.session_id.clone(),
        MessageRole::Assistant,
        outcome.answer.clone(),
        Some(outcome.parts.clone()),
        Some(outcome.files_used.clone()),
        input.source,
    );
    let message_id = assistant_message.id.clone();
    state
        .db
        .store_item(assistant_message)
        .await
        .map_err(AppError::from)?;

    // Trending recompute runs in the background; it must neither delay nor
    // fail the response already built.
    if state.config.trending_refresh {
        let db = std::sync::Arc::clone(&state.db);
        let pipeline = std::sync::Arc::clone(&state.pipeline);
        tokio::spawn(async move {
            if let Err(e) = refresh_trending(
                &db,
                &pipeline.completion,
                &pipeline.config.verifier_model,
                SourceScope::All,
                5,
            )
            .await
            {
                warn!("Trending refresh failed: {e}");
            }
        });
    }

    let delays = typing_delays(&outcome.parts);
    Ok(Json(ChatResponse {
        answer: outcome.answer,
        files_used: outcome.files_used,
        message_parts: outcome.parts,
        performance: outcome.timings,
        typing_delays: delays,
        message_id,
    }))
}

/// Error taxonomy bucket recorded with a failed request.
fn error_kind(error: &AppError) -> &'static str {
    match error {
        AppError::Scorer(_) => "retrieval",
        AppError::Completion(_) | AppError::OpenAI(_) | AppError::LLMParsing(_) => "generation",
        AppError::Database(_) => "storage",
        AppError::Io(_) => "knowledge_base",
        _ => "internal",
    }
}
