use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api_state::ApiState;

#[derive(Debug, Deserialize)]
pub struct ClearHistoryRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ClearHistoryResponse {
    pub success: bool,
    pub message: String,
}

/// Empty the conversation window of a session. The session itself survives
/// and the next question starts from a clean history.
pub async fn clear_history(
    State(state): State<ApiState>,
    Json(input): Json<ClearHistoryRequest>,
) -> impl IntoResponse {
    if state.pipeline.sessions.clear(&input.session_id).await {
        info!(session_id = %input.session_id, "Cleared conversation history");
        Json(ClearHistoryResponse {
            success: true,
            message: "Conversation history cleared".to_string(),
        })
    } else {
        Json(ClearHistoryResponse {
            success: false,
            message: "Session not found".to_string(),
        })
    }
}
