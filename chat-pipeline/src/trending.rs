use std::collections::HashMap;

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            chat_message::{ChatMessage, SourceScope},
            trending_question::TrendingQuestion,
        },
    },
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{completion::CompletionClient, prompt::PromptMessage};

/// Hotline applications a question group can be attributed to.
pub static APPLICATIONS: [&str; 16] = [
    "Webex",
    "CICsSAM",
    "SAMnet",
    "Phonebook",
    "MyParking",
    "Triskell",
    "LotusNotes",
    "MS365",
    "Horaire Mobile",
    "SAS",
    "Artis",
    "Argos",
    "MyPortal",
    "DSKNet",
    "Gesper",
    "MyGesper",
];

const MAX_GROUPS: usize = 10;

#[derive(Debug, Deserialize, PartialEq)]
struct TrendGroup {
    question: String,
    count: i64,
    #[serde(default)]
    application: Option<String>,
}

/// Recompute the trending questions for one scope from today's traffic.
///
/// The grouping model is advisory: any failure there degrades to a plain
/// frequency count, so a refresh only errors on storage problems.
pub async fn refresh_trending(
    db: &SurrealDbClient,
    completion: &CompletionClient,
    model: &str,
    scope: SourceScope,
    limit: usize,
) -> Result<Vec<TrendingQuestion>, AppError> {
    let questions = ChatMessage::questions_from_today(db, scope).await?;
    if questions.is_empty() {
        info!("No questions found today for scope '{}'", scope.as_str());
        return Ok(Vec::new());
    }

    let groups = match group_similar_questions(completion, model, &questions).await {
        Ok(groups) if !groups.is_empty() => groups,
        Ok(_) => {
            warn!("Question grouping returned nothing, falling back to frequency count");
            frequency_groups(&questions, MAX_GROUPS)
        }
        Err(e) => {
            warn!("Question grouping failed ({e}), falling back to frequency count");
            frequency_groups(&questions, MAX_GROUPS)
        }
    };

    let entries = groups
        .into_iter()
        .map(|group| {
            TrendingQuestion::new(group.question, group.count, scope, group.application)
        })
        .collect();

    TrendingQuestion::replace_for_scope(db, scope, entries).await?;
    TrendingQuestion::top(db, limit, scope).await
}

/// Ask the light model to cluster raw questions into generic ones, counted
/// and attributed to a known application when one is clearly concerned.
async fn group_similar_questions(
    completion: &CompletionClient,
    model: &str,
    questions: &[String],
) -> Result<Vec<TrendGroup>, AppError> {
    let numbered = questions
        .iter()
        .enumerate()
        .map(|(index, question)| format!("{}. {question}", index + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let instructions = format!(
        "Here is the list of questions asked today:\n{numbered}\n\n\
         Group questions about the same topic, phrase one generic question per group, \
         and count the questions in each group. If a group clearly concerns one of the \
         following applications, name it exactly as written, otherwise use null: {}.\n\
         Answer ONLY with a JSON array of objects of the form \
         {{\"question\": \"...\", \"count\": N, \"application\": \"...\" or null}}, \
         ordered by decreasing count, at most {MAX_GROUPS} groups.",
        APPLICATIONS.join(", ")
    );

    let messages = vec![
        PromptMessage::system("You are an assistant specialized in analysing user questions."),
        PromptMessage::user(instructions),
    ];

    let reply = completion.complete(model, &messages, 2000).await?;
    let payload = extract_json(&reply).ok_or_else(|| {
        AppError::LLMParsing(format!("no JSON payload in grouping reply: {reply}"))
    })?;

    serde_json::from_str(&payload)
        .map_err(|e| AppError::LLMParsing(format!("failed to parse grouping reply: {e}")))
}

/// Pull the first JSON array (or object) out of a reply that may carry
/// prose around it.
fn extract_json(text: &str) -> Option<&str> {
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if start < end {
                return Some(&text[start..=end]);
            }
        }
    }
    None
}

/// Grouping fallback: exact-match frequency count, first-seen order on ties.
fn frequency_groups(questions: &[String], limit: usize) -> Vec<TrendGroup> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for question in questions {
        let entry = counts.entry(question.as_str()).or_insert(0);
        if *entry == 0 {
            order.push(question.as_str());
        }
        *entry += 1;
    }

    let mut groups: Vec<TrendGroup> = order
        .into_iter()
        .map(|question| TrendGroup {
            question: question.to_string(),
            count: counts.get(question).copied().unwrap_or(0),
            application: None,
        })
        .collect();

    groups.sort_by_key(|group| std::cmp::Reverse(group.count));
    groups.truncate(limit);
    groups
}
