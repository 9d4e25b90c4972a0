use std::{collections::HashSet, time::Duration};

use common::{
    error::AppError,
    utils::config::{AppConfig, ScorerBackend},
};
use serde::{Deserialize, Serialize};

/// Relevance scoring over (query, passage) pairs.
///
/// The production backend is an external cross-encoder service reached over
/// HTTP; the lexical backend is a deterministic token-overlap fallback used
/// offline and in tests.
pub struct RelevanceScorer {
    inner: ScorerInner,
}

enum ScorerInner {
    CrossEncoder {
        http: reqwest::Client,
        endpoint: String,
    },
    Lexical,
}

#[derive(Serialize)]
struct ScorePair<'a> {
    query: &'a str,
    passage: &'a str,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    pairs: Vec<ScorePair<'a>>,
}

#[derive(Deserialize)]
struct ScoreResponse {
    scores: Vec<f32>,
}

impl RelevanceScorer {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        match config.scorer_backend {
            ScorerBackend::Crossencoder => Self::new_cross_encoder(&config.scorer_url),
            ScorerBackend::Lexical => Ok(Self::new_lexical()),
        }
    }

    pub fn new_cross_encoder(endpoint: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: ScorerInner::CrossEncoder {
                http,
                endpoint: endpoint.to_string(),
            },
        })
    }

    pub const fn new_lexical() -> Self {
        Self {
            inner: ScorerInner::Lexical,
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            ScorerInner::CrossEncoder { .. } => "crossencoder",
            ScorerInner::Lexical => "lexical",
        }
    }

    /// Score every passage against the query. The output is parallel to the
    /// input; a batch of N passages always yields N scores or an error.
    pub async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, AppError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        match &self.inner {
            ScorerInner::CrossEncoder { http, endpoint } => {
                let request = ScoreRequest {
                    pairs: passages
                        .iter()
                        .map(|passage| ScorePair { query, passage })
                        .collect(),
                };

                let response = http
                    .post(endpoint)
                    .json(&request)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| {
                        AppError::Scorer(format!("scoring request to {endpoint} failed: {e}"))
                    })?;

                let body: ScoreResponse = response.json().await.map_err(|e| {
                    AppError::Scorer(format!("invalid scorer response from {endpoint}: {e}"))
                })?;

                if body.scores.len() != passages.len() {
                    return Err(AppError::Scorer(format!(
                        "scorer returned {} scores for {} pairs",
                        body.scores.len(),
                        passages.len()
                    )));
                }

                Ok(body.scores)
            }
            ScorerInner::Lexical => Ok(passages
                .iter()
                .map(|passage| lexical_overlap(query, passage))
                .collect()),
        }
    }
}

/// Fraction of distinct query tokens that appear in the passage, in [0, 1].
fn lexical_overlap(query: &str, passage: &str) -> f32 {
    let query_tokens: HashSet<String> = tokens(query).collect();
    if query_tokens.is_empty() {
        return 0.0;
    }

    let passage_tokens: HashSet<String> = tokens(passage).collect();
    let matched = query_tokens
        .iter()
        .filter(|token| passage_tokens.contains(*token))
        .count();

    matched as f32 / query_tokens.len() as f32
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}
