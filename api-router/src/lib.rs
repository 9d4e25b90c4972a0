use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    chat::chat, feedback::submit_feedback, history::clear_history, liveness::live, rag::run_rag,
    readiness::ready, trending::trending_questions,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for the chatbot HTTP surface.
pub fn api_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probe endpoints are unauthenticated (for k8s/systemd probes)
    Router::new()
        .route("/rag", post(run_rag))
        .route("/chat", post(chat))
        .route("/clear_history", post(clear_history))
        .route("/feedback", post(submit_feedback))
        .route("/trending_questions", get(trending_questions))
        .route("/live", get(live))
        .route("/ready", get(ready))
}
