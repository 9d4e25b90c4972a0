use std::{io::Write, path::Path, sync::Arc};

use api_router::{api_routes, api_state::ApiState};
use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use chat_pipeline::{
    ChatPipeline, CompletionClient, DocumentHostClient, RelevanceGate, SessionStore,
    MAX_WINDOW_TURNS,
};
use common::{storage::db::SurrealDbClient, utils::config::AppConfig};
use retrieval_pipeline::{KnowledgeBaseCache, RelevanceScorer};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

/// A port that is almost certainly closed: stands in for a document host
/// that is down.
const DOWN_HOST: &str = "http://127.0.0.1:9";

fn write_file(dir: &Path, name: &str, content: &str) {
    let mut file = std::fs::File::create(dir.join(name)).expect("Failed to create test file");
    file.write_all(content.as_bytes())
        .expect("Failed to write test file");
}

/// Throwaway collaborator serving the given document names.
async fn spawn_document_host(served: Vec<String>) -> String {
    let app = Router::new()
        .route("/", get(|| async { "document host" }))
        .route(
            "/documents/{name}",
            get(
                |State(served): State<Arc<Vec<String>>>, UrlPath(name): UrlPath<String>| async move {
                    if served.contains(&name) {
                        StatusCode::OK
                    } else {
                        StatusCode::NOT_FOUND
                    }
                },
            ),
        )
        .with_state(Arc::new(served));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind document host listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("document host");
    });

    format!("http://{addr}")
}

/// Assembled service over an in-memory database, the lexical scorer and a
/// canned completion backend. No external dependency is touched.
async fn test_state(replies: Vec<&str>, document_host_url: &str) -> ApiState {
    let config = AppConfig {
        trending_refresh: false,
        ..AppConfig::default()
    };

    let db = Arc::new(
        SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb"),
    );
    db.ensure_initialized()
        .await
        .expect("Failed to initialize schema");

    let completion = Arc::new(CompletionClient::canned(
        replies.into_iter().map(ToString::to_string),
    ));
    let pipeline = Arc::new(ChatPipeline {
        kb_cache: Arc::new(KnowledgeBaseCache::new()),
        scorer: Arc::new(RelevanceScorer::new_lexical()),
        sessions: Arc::new(SessionStore::new()),
        completion: Arc::clone(&completion),
        gate: RelevanceGate::new(completion, config.verifier_model.clone()),
        documents: DocumentHostClient::new(document_host_url)
            .expect("Failed to build document host client"),
        config: config.clone(),
    });

    ApiState::with_resources(db, pipeline, config)
}

fn app(state: &ApiState) -> Router {
    Router::new().merge(api_routes()).with_state(state.clone())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn scenario_matching_document_with_citation() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");
    write_file(
        kb.path(),
        "mot_de_passe.txt",
        "Pour réinitialiser votre mot de passe, connectez-vous à MyPortal et \
         suivez la procédure de récupération.",
    );

    let host = spawn_document_host(vec!["mot_de_passe.txt".to_string()]).await;
    let state = test_state(
        vec![
            "Connectez-vous à **MyPortal** pour réinitialiser votre mot de passe.",
            "yes",
        ],
        &host,
    )
    .await;
    let app = app(&state);

    let (status, body) = post_json(
        &app,
        "/chat",
        json!({
            "question": "Comment réinitialiser mon mot de passe ?",
            "knowledge_base": kb.path().to_str().expect("utf-8 path"),
            "session_id": "scenario-1",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["answer"].as_str().expect("answer").is_empty());
    assert_eq!(body["files_used"], json!(["mot_de_passe.txt"]));

    // Gate said yes and the host serves the file: the citation is a separate
    // trailing part
    let parts = body["message_parts"].as_array().expect("parts");
    assert_eq!(parts.len(), 2);
    let citation = parts[1].as_str().expect("citation part");
    assert!(citation.contains("/documents/mot_de_passe.txt"));

    let delays = body["typing_delays"].as_array().expect("delays");
    assert_eq!(delays.len(), parts.len());
    assert!(!body["message_id"].as_str().expect("message_id").is_empty());
    assert!(body["performance"]["total_ms"].is_u64());
}

#[tokio::test]
async fn scenario_negative_verdict_suppresses_citation() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");
    write_file(kb.path(), "mot_de_passe.txt", "Procédure de mot de passe.");

    let host = spawn_document_host(vec!["mot_de_passe.txt".to_string()]).await;
    let state = test_state(vec!["Je ne sais pas.", "no"], &host).await;
    let app = app(&state);

    let (status, body) = post_json(
        &app,
        "/chat",
        json!({
            "question": "Comment réinitialiser mon mot de passe ?",
            "knowledge_base": kb.path().to_str().expect("utf-8 path"),
            "session_id": "scenario-1b",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message_parts"].as_array().expect("parts").len(),
        1,
        "a negative verdict must not append a citation"
    );
}

#[tokio::test]
async fn scenario_greeting_with_empty_retrieval() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");

    // A single canned reply: any relevance-gate call would fail the request
    let state = test_state(vec!["Bonjour ! Comment puis-je vous aider ?"], DOWN_HOST).await;
    let app = app(&state);

    let (status, body) = post_json(
        &app,
        "/chat",
        json!({
            "question": "bonjour",
            "knowledge_base": kb.path().to_str().expect("utf-8 path"),
            "session_id": "scenario-2",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files_used"], json!([]));
    assert_eq!(body["message_parts"].as_array().expect("parts").len(), 1);
}

#[tokio::test]
async fn scenario_second_call_carries_one_history_pair() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");
    let state = test_state(vec!["Première réponse.", "Seconde réponse."], DOWN_HOST).await;
    let app = app(&state);
    let kb_path = kb.path().to_str().expect("utf-8 path");

    let (status, first) = post_json(
        &app,
        "/chat",
        json!({
            "question": "Première question",
            "knowledge_base": kb_path,
            "session_id": "scenario-3",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The prompt of the next call is built from this window: exactly one
    // complete pair from the first exchange
    let window = state
        .pipeline
        .sessions
        .window("scenario-3", MAX_WINDOW_TURNS)
        .await;
    assert_eq!(
        window,
        vec![(
            "Première question".to_string(),
            "Première réponse.".to_string()
        )]
    );

    let (status, second) = post_json(
        &app,
        "/chat",
        json!({
            "question": "Seconde question",
            "knowledge_base": kb_path,
            "session_id": "scenario-3",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(first["message_id"], second["message_id"]);

    let window = state
        .pipeline
        .sessions
        .window("scenario-3", MAX_WINDOW_TURNS)
        .await;
    assert_eq!(window.len(), 2);
}

#[tokio::test]
async fn scenario_clear_history_resets_window() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");
    let state = test_state(vec!["Réponse un.", "Réponse deux."], DOWN_HOST).await;
    let app = app(&state);
    let kb_path = kb.path().to_str().expect("utf-8 path");

    post_json(
        &app,
        "/chat",
        json!({
            "question": "Première question",
            "knowledge_base": kb_path,
            "session_id": "scenario-4",
        }),
    )
    .await;

    let (status, body) = post_json(
        &app,
        "/clear_history",
        json!({"session_id": "scenario-4"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    // The next exchange starts from an empty window
    assert!(state
        .pipeline
        .sessions
        .window("scenario-4", MAX_WINDOW_TURNS)
        .await
        .is_empty());

    let (status, _) = post_json(
        &app,
        "/chat",
        json!({
            "question": "Nouvelle question",
            "knowledge_base": kb_path,
            "session_id": "scenario-4",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = post_json(
        &app,
        "/clear_history",
        json!({"session_id": "session-inconnue"}),
    )
    .await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Session not found"));
}

#[tokio::test]
async fn feedback_references_a_stored_answer() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");
    let state = test_state(vec!["Réponse."], DOWN_HOST).await;
    let app = app(&state);

    let (_, chat_body) = post_json(
        &app,
        "/chat",
        json!({
            "question": "Une question",
            "knowledge_base": kb.path().to_str().expect("utf-8 path"),
            "session_id": "feedback-session",
        }),
    )
    .await;
    let message_id = chat_body["message_id"].as_str().expect("message_id");

    let (status, body) = post_json(
        &app,
        "/feedback",
        json!({"message_id": message_id, "rating": 5, "comment": "Merci !"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (status, body) = post_json(
        &app,
        "/feedback",
        json!({"message_id": "id-fantome", "rating": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn trending_questions_force_update_and_read_back() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");
    // First reply answers the chat, second groups the day's questions
    let state = test_state(
        vec![
            "Réponse.",
            "[{\"question\": \"Connexion Webex\", \"count\": 1, \"application\": \"Webex\"}]",
        ],
        DOWN_HOST,
    )
    .await;
    let app = app(&state);

    post_json(
        &app,
        "/chat",
        json!({
            "question": "Webex ne démarre pas",
            "knowledge_base": kb.path().to_str().expect("utf-8 path"),
            "session_id": "trending-session",
        }),
    )
    .await;

    let (status, body) = get_json(&app, "/trending_questions?force_update=true&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    let trends = body.as_array().expect("trend list");
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0]["question"], json!("Connexion Webex"));
    assert_eq!(trends[0]["application"], json!("Webex"));
    assert_eq!(trends[0]["source"], json!("all"));

    // Without force_update the stored batch is served
    let (status, body) = get_json(&app, "/trending_questions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("trend list").len(), 1);

    let (status, _) = get_json(&app, "/trending_questions?source=robot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rag_endpoint_returns_context_and_files() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");
    write_file(
        kb.path(),
        "vpn.txt",
        "La connexion VPN passe par le portail d'accès distant.",
    );

    let state = test_state(Vec::new(), DOWN_HOST).await;
    let app = app(&state);

    let (status, body) = post_json(
        &app,
        "/rag",
        json!({
            "question": "Comment configurer le VPN ?",
            "knowledge_base": kb.path().to_str().expect("utf-8 path"),
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files_used"], json!(["vpn.txt"]));
    assert!(body["context"]
        .as_str()
        .expect("context")
        .contains("portail d'accès distant"));
}

#[tokio::test]
async fn chat_rejects_blank_question() {
    let state = test_state(Vec::new(), DOWN_HOST).await;
    let app = app(&state);

    let (status, _) = post_json(
        &app,
        "/chat",
        json!({
            "question": "   ",
            "knowledge_base": "/tmp/kb",
            "session_id": "s",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generation_failure_surfaces_and_is_recorded() {
    let kb = tempfile::tempdir().expect("Failed to create temp dir");
    // No canned replies: generation fails
    let state = test_state(Vec::new(), DOWN_HOST).await;
    let app = app(&state);

    let (status, body) = post_json(
        &app,
        "/chat",
        json!({
            "question": "Une question",
            "knowledge_base": kb.path().to_str().expect("utf-8 path"),
            "session_id": "failure-session",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // The caller sees a generic error, not backend details
    assert_eq!(body["error"], json!("Internal server error"));

    let events = state
        .db
        .get_all_stored_items::<common::storage::types::error_event::ErrorEvent>()
        .await
        .expect("Failed to list error events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "generation");
}
