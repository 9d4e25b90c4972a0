pub mod kb;
pub mod scorer;

use std::cmp::Ordering;

use common::error::AppError;
use serde::Serialize;

pub use kb::{Chunk, KnowledgeBase, KnowledgeBaseCache, CHUNK_SIZE};
pub use scorer::RelevanceScorer;

/// A document selected for the prompt context, with the score of the chunk
/// that earned the selection.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocument {
    pub name: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    /// Full document texts, deduplicated, joined with blank lines.
    pub context: String,
    /// Descending-score order.
    pub documents: Vec<RetrievedDocument>,
}

impl RetrievalResult {
    pub fn file_names(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.name.clone()).collect()
    }
}

/// Score every chunk of the knowledge base against the question and build
/// the context from the top-k hits.
///
/// A chunk hit pulls in its whole source document, not just the matching
/// slice, so the prompt never sees a mid-document truncation. Scorer
/// failures propagate to the caller; retrieval has no fallback of its own.
pub async fn retrieve(
    cache: &KnowledgeBaseCache,
    scorer: &RelevanceScorer,
    question: &str,
    kb_path: &str,
    k: usize,
) -> Result<RetrievalResult, AppError> {
    let kb = cache.load(kb_path).await?;
    if kb.chunks().is_empty() || k == 0 {
        return Ok(RetrievalResult::default());
    }

    let passages: Vec<&str> = kb.chunks().iter().map(|c| c.text.as_str()).collect();
    let scores = scorer.score(question, &passages).await?;

    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    // Stable sort: equal scores keep original chunk order
    ranked.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut documents: Vec<RetrievedDocument> = Vec::new();
    let mut contexts: Vec<&str> = Vec::new();
    for &idx in ranked.iter().take(k) {
        let chunk = &kb.chunks()[idx];
        if documents.iter().any(|d| d.name == chunk.document) {
            continue;
        }
        if let Some(text) = kb.document_text(&chunk.document) {
            documents.push(RetrievedDocument {
                name: chunk.document.clone(),
                score: scores[idx],
            });
            contexts.push(text);
        }
    }

    Ok(RetrievalResult {
        context: contexts.join("\n\n"),
        documents,
    })
}
