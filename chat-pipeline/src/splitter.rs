use tracing::warn;

use crate::{completion::CompletionClient, prompt::PromptMessage};

/// Separator token the generator is instructed to emit between sections.
pub const PART_SEPARATOR: &str = "[PART]";
/// Answers below this many characters are delivered as a single message.
pub const SHORT_ANSWER_LIMIT: usize = 400;
pub const MIN_PARTS: usize = 2;
pub const MAX_PARTS: usize = 5;

// Private-use sentinels wrapping masked bold spans; they contain no sentence
// punctuation so masked text survives the sentence splitter untouched.
const MASK_OPEN: char = '\u{E000}';
const MASK_CLOSE: char = '\u{E001}';

/// Decompose an answer into 2–5 display-sized parts.
///
/// Short input comes back as one unchanged part. An explicit separator wins
/// when present; otherwise the deterministic sentence-boundary algorithm
/// runs. The deterministic path cannot fail on well-formed text.
pub fn split(text: &str) -> Vec<String> {
    if text.chars().count() < SHORT_ANSWER_LIMIT {
        return vec![text.to_string()];
    }

    if text.contains(PART_SEPARATOR) {
        let parts = split_on_separator(text);
        if !parts.is_empty() {
            return parts;
        }
    }

    sentence_split(text, target_part_count(text))
}

/// Model-assisted variant: ask the generator to re-emit the text with
/// exactly `target - 1` separators, keep the result when it lands within
/// bounds, fall back to the deterministic algorithm otherwise.
pub async fn split_with_model(
    client: &CompletionClient,
    model: &str,
    text: &str,
) -> Vec<String> {
    if text.chars().count() < SHORT_ANSWER_LIMIT {
        return vec![text.to_string()];
    }

    let target = target_part_count(text);
    let messages = vec![
        PromptMessage::system(format!(
            "You are a text segmentation assistant. Reproduce the user's text exactly, \
             inserting the token {PART_SEPARATOR} at {} natural boundaries so the text \
             forms {target} self-contained parts. Do not add, remove or rephrase anything else.",
            target - 1
        )),
        PromptMessage::user(text.to_string()),
    ];

    match client.complete(model, &messages, 6000).await {
        Ok(reply) => {
            let parts = split_on_separator(&reply);
            if parts.len() >= MIN_PARTS {
                parts
            } else {
                warn!(
                    "Model-assisted split produced {} usable parts, using deterministic split",
                    parts.len()
                );
                split(text)
            }
        }
        Err(e) => {
            warn!("Model-assisted split failed ({e}), using deterministic split");
            split(text)
        }
    }
}

/// Staged-delivery pacing: one delay per part, proportional to its length.
pub fn typing_delays(parts: &[String]) -> Vec<u64> {
    parts
        .iter()
        .map(|part| (part.chars().count() as u64 * 25).clamp(600, 3500))
        .collect()
}

/// Split on the explicit separator. More than `MAX_PARTS` sections are
/// merged down; fewer than `MIN_PARTS` are accepted as long as one
/// non-empty part remains.
fn split_on_separator(text: &str) -> Vec<String> {
    let parts: Vec<String> = text
        .split(PART_SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect();

    if parts.len() > MAX_PARTS {
        return group_evenly(parts, MAX_PARTS, "\n\n");
    }
    parts
}

/// Length bands choosing how many parts a separator-less answer becomes.
fn target_part_count(text: &str) -> usize {
    let len = text.chars().count();
    let target = if len < 1200 {
        2
    } else if len < 2000 {
        3
    } else if len < 3000 {
        4
    } else {
        5
    };
    target.clamp(MIN_PARTS, MAX_PARTS)
}

/// Deterministic fallback: mask bold spans, split on sentence boundaries,
/// distribute sentences evenly, restore the spans.
fn sentence_split(text: &str, target: usize) -> Vec<String> {
    let (masked, spans) = mask_bold_spans(text);
    let sentences = split_sentences(&masked);
    if sentences.is_empty() {
        return vec![text.to_string()];
    }

    group_evenly(sentences, target, " ")
        .into_iter()
        .map(|part| restore_bold_spans(&part, &spans))
        .collect()
}

/// Replace every complete `**...**` span with an opaque placeholder so no
/// split point can land inside it. An unpaired trailing marker is left
/// alone.
fn mask_bold_spans(text: &str) -> (String, Vec<String>) {
    let mut masked = String::with_capacity(text.len());
    let mut spans = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let Some(end) = rest[start + 2..].find("**") else {
            break;
        };
        let span_end = start + 2 + end + 2;
        masked.push_str(&rest[..start]);
        masked.push(MASK_OPEN);
        masked.push_str(&spans.len().to_string());
        masked.push(MASK_CLOSE);
        spans.push(rest[start..span_end].to_string());
        rest = &rest[span_end..];
    }

    masked.push_str(rest);
    (masked, spans)
}

fn restore_bold_spans(text: &str, spans: &[String]) -> String {
    let mut restored = text.to_string();
    for (index, span) in spans.iter().enumerate() {
        restored = restored.replace(&format!("{MASK_OPEN}{index}{MASK_CLOSE}"), span);
    }
    restored
}

/// Sentence boundaries: terminal punctuation followed by whitespace or end
/// of input. "3.5" or "v1.2" never split.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|next| next.is_whitespace()) {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Concatenate `items` into at most `target` groups of near-equal item
/// count, preserving order.
fn group_evenly(items: Vec<String>, target: usize, joiner: &str) -> Vec<String> {
    let target = target.min(items.len()).max(1);
    let base = items.len() / target;
    let extra = items.len() % target;

    let mut groups = Vec::with_capacity(target);
    let mut iter = items.into_iter();
    for index in 0..target {
        let take = base + usize::from(index < extra);
        let group: Vec<String> = iter.by_ref().take(take).collect();
        groups.push(group.join(joiner));
    }

    groups
}
