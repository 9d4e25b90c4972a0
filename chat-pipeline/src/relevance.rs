use std::sync::Arc;

use tracing::warn;

use crate::{
    completion::CompletionClient,
    prompt::PromptMessage,
};

/// Typed verdict of the secondary relevance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    Relevant,
    NotRelevant,
}

pub static VERIFIER_SYSTEM_PROMPT: &str = "You are a verifier. You are given retrieved documents, a user question and the assistant's answer. Decide whether the concepts of the documents overlap with the question, i.e. whether the documents were actually useful for the answer. Reply with exactly one word: yes or no.";

/// Fuzzy affirmative matching, isolated so the policy can be swapped for
/// stricter parsing without touching callers. Any reply containing the
/// token, in any case, counts as affirmative.
pub fn parse_verdict(reply: &str) -> Relevance {
    if reply.to_lowercase().contains("yes") {
        Relevance::Relevant
    } else {
        Relevance::NotRelevant
    }
}

/// Asks a (possibly lighter) model whether retrieved documents were used in
/// the answer; the result gates citation display.
pub struct RelevanceGate {
    client: Arc<CompletionClient>,
    model: String,
}

impl RelevanceGate {
    pub fn new(client: Arc<CompletionClient>, model: String) -> Self {
        Self { client, model }
    }

    /// Classification failures degrade to `NotRelevant`: missing a citation
    /// is acceptable, crashing the request over one is not.
    pub async fn assess(&self, question: &str, answer: &str, context: &str) -> Relevance {
        let messages = vec![
            PromptMessage::system(VERIFIER_SYSTEM_PROMPT),
            PromptMessage::user(format!(
                "Documents:\n{context}\n\nQuestion: {question}\n\nAnswer: {answer}"
            )),
        ];

        match self.client.complete(&self.model, &messages, 10).await {
            Ok(reply) => parse_verdict(&reply),
            Err(e) => {
                warn!("Relevance verification failed, treating as not relevant: {e}");
                Relevance::NotRelevant
            }
        }
    }
}
