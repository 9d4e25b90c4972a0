use std::str::FromStr;

use axum::{
    extract::{Query, State},
    Json,
};
use chat_pipeline::trending::refresh_trending;
use common::storage::types::{
    chat_message::SourceScope, trending_question::TrendingQuestion,
};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub force_update: bool,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_limit() -> usize {
    5
}

fn default_source() -> String {
    "all".to_string()
}

#[derive(Debug, Serialize)]
pub struct TrendingQuestionView {
    pub question: String,
    pub count: i64,
    pub source: String,
    pub application: Option<String>,
}

/// Today's most asked questions for a scope, optionally recomputed first.
pub async fn trending_questions(
    State(state): State<ApiState>,
    Query(params): Query<TrendingParams>,
) -> Result<Json<Vec<TrendingQuestionView>>, ApiError> {
    let scope = SourceScope::from_str(&params.source)
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let trends = if params.force_update {
        refresh_trending(
            &state.db,
            &state.pipeline.completion,
            &state.pipeline.config.verifier_model,
            scope,
            params.limit,
        )
        .await?
    } else {
        TrendingQuestion::top(&state.db, params.limit, scope).await?
    };

    Ok(Json(
        trends
            .into_iter()
            .map(|trend| TrendingQuestionView {
                question: trend.question,
                count: trend.count,
                source: trend.scope.as_str().to_string(),
                application: trend.application,
            })
            .collect(),
    ))
}
