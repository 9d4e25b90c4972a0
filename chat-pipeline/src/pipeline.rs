use std::{sync::Arc, time::Instant};

use common::{error::AppError, utils::config::AppConfig};
use retrieval_pipeline::{retrieve, KnowledgeBaseCache, RelevanceScorer};
use serde::Serialize;
use tracing::info;

use crate::{
    completion::CompletionClient,
    documents::DocumentHostClient,
    prompt::build_messages,
    relevance::{Relevance, RelevanceGate},
    session::{SessionStore, MAX_WINDOW_TURNS},
    splitter::{split, split_with_model},
};

/// Per-stage wall-clock timings of one answered question, in milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageTimings {
    pub retrieval_ms: u64,
    pub generation_ms: u64,
    pub verification_ms: u64,
    pub splitting_ms: u64,
    pub total_ms: u64,
}

/// Everything the transport layer needs to deliver one answer.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub answer: String,
    pub files_used: Vec<String>,
    pub parts: Vec<String>,
    pub timings: StageTimings,
}

/// The conversational RAG chain: retrieve → window → assemble → generate →
/// verify/cite → split → record the exchange. One sequential pass per
/// question, no internal parallelism.
pub struct ChatPipeline {
    pub kb_cache: Arc<KnowledgeBaseCache>,
    pub scorer: Arc<RelevanceScorer>,
    pub sessions: Arc<SessionStore>,
    pub completion: Arc<CompletionClient>,
    pub gate: RelevanceGate,
    pub documents: DocumentHostClient,
    pub config: AppConfig,
}

impl ChatPipeline {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let completion = Arc::new(CompletionClient::from_config(config)?);
        Ok(Self {
            kb_cache: Arc::new(KnowledgeBaseCache::new()),
            scorer: Arc::new(RelevanceScorer::from_config(config)?),
            sessions: Arc::new(SessionStore::new()),
            completion: Arc::clone(&completion),
            gate: RelevanceGate::new(completion, config.verifier_model.clone()),
            documents: DocumentHostClient::new(&config.document_host_url)?,
            config: config.clone(),
        })
    }

    pub async fn respond(
        &self,
        session_id: &str,
        question: &str,
        kb_path: &str,
        model: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<ChatOutcome, AppError> {
        let started = Instant::now();
        let mut timings = StageTimings::default();

        let stage = Instant::now();
        let retrieval = retrieve(&self.kb_cache, &self.scorer, question, kb_path, 1).await?;
        timings.retrieval_ms = stage.elapsed().as_millis() as u64;

        let history = self.sessions.window(session_id, MAX_WINDOW_TURNS).await;
        let messages = build_messages(&retrieval.context, &history, question);

        let model = model.unwrap_or(&self.config.chat_model);
        let max_tokens = max_tokens.unwrap_or(self.config.chat_max_tokens);

        let stage = Instant::now();
        let answer = self.completion.complete(model, &messages, max_tokens).await?;
        timings.generation_ms = stage.elapsed().as_millis() as u64;

        // The gate only runs when retrieval produced documents; without them
        // there is nothing to cite.
        let citation = if retrieval.documents.is_empty() {
            None
        } else {
            let stage = Instant::now();
            let verdict = self
                .gate
                .assess(question, &answer, &retrieval.context)
                .await;
            let citation = match verdict {
                Relevance::Relevant => {
                    self.documents
                        .citation_part(&retrieval.file_names())
                        .await
                }
                Relevance::NotRelevant => None,
            };
            timings.verification_ms = stage.elapsed().as_millis() as u64;
            citation
        };

        let stage = Instant::now();
        let mut parts = if self.config.smart_split {
            split_with_model(&self.completion, &self.config.verifier_model, &answer).await
        } else {
            split(&answer)
        };
        if let Some(citation) = citation {
            parts.push(citation);
        }
        timings.splitting_ms = stage.elapsed().as_millis() as u64;

        self.sessions
            .append_exchange(session_id, question.to_string(), answer.clone())
            .await;

        timings.total_ms = started.elapsed().as_millis() as u64;
        info!(
            session_id,
            files = retrieval.documents.len(),
            parts = parts.len(),
            total_ms = timings.total_ms,
            "Answered question"
        );

        Ok(ChatOutcome {
            answer,
            files_used: retrieval.file_names(),
            parts,
            timings,
        })
    }
}
