use crate::splitter::PART_SEPARATOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// Canned reply for technical questions the documents cannot answer. The
/// template instructs the model to emit this string verbatim.
pub static REFUSAL_MESSAGE: &str =
    "Je suis désolé, je n'ai pas assez d'informations pour répondre à cette question technique.";

pub static CHAT_SYSTEM_TEMPLATE: &str = r#"You are Oskour, a helpful hotline assistant.
Always respond to user queries in French.
For technical questions, rely on the provided documents to answer.
For casual conversation or greetings like 'bonjour', 'ça va ?', respond in a friendly and conversational manner.
Only if the user is asking a technical question and the answer is not in the documents, respond exactly: 'Je suis désolé, je n'ai pas assez d'informations pour répondre à cette question technique.'
Never close your answer with a generic invitation such as 'N'hésitez pas à me poser d'autres questions.'; follow-ups are handled elsewhere.
When the user asks about something said earlier, rely on the conversation history to recall it.
Structure long answers into 2 to 5 short sections separated by the token [PART], and highlight at most 2-3 key terms per section in bold using **double asterisks**.

Documents:
{context}"#;

/// Assemble the ordered message sequence for the generator: exactly one
/// system message first, the windowed history verbatim, the live question
/// last. Alternation correctness is the window's job, not ours.
pub fn build_messages(
    context: &str,
    history: &[(String, String)],
    question: &str,
) -> Vec<PromptMessage> {
    let mut messages =
        vec![PromptMessage::system(CHAT_SYSTEM_TEMPLATE.replace("{context}", context))];

    for (user_turn, assistant_turn) in history {
        messages.push(PromptMessage::user(user_turn.clone()));
        messages.push(PromptMessage::assistant(assistant_turn.clone()));
    }

    messages.push(PromptMessage::user(question.to_string()));
    messages
}
