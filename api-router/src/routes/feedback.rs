use axum::{extract::State, response::IntoResponse, Json};
use common::{error::AppError, storage::types::feedback::Feedback};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub message_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}

pub async fn submit_feedback(
    State(state): State<ApiState>,
    Json(input): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match Feedback::record(&state.db, &input.message_id, input.rating, input.comment).await {
        Ok(_) => {
            info!(message_id = %input.message_id, rating = input.rating, "Recorded feedback");
            Ok(Json(FeedbackResponse {
                success: true,
                message: "Feedback recorded".to_string(),
            }))
        }
        Err(AppError::NotFound(_)) => Ok(Json(FeedbackResponse {
            success: false,
            message: "Message not found".to_string(),
        })),
        Err(e) => Err(e.into()),
    }
}
