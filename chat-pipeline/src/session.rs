use std::collections::HashMap;

use tokio::sync::RwLock;

/// Turn limit for the prompt window: 10 turns, i.e. up to 5 exchanges.
pub const MAX_WINDOW_TURNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

/// Process-wide conversation history, keyed by opaque session id.
///
/// Sessions are created empty on first reference and never expire; clearing
/// empties the turn list but keeps the entry. All mutation goes through one
/// write lock, and [`SessionStore::append_exchange`] pushes both turns of an
/// exchange inside a single critical section so concurrent requests on the
/// same session cannot interleave a pair.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, session_id: &str, role: TurnRole, content: String) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .push(Turn { role, content });
    }

    /// Append a completed exchange atomically.
    pub async fn append_exchange(&self, session_id: &str, question: String, answer: String) {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push(Turn {
            role: TurnRole::User,
            content: question,
        });
        turns.push(Turn {
            role: TurnRole::Assistant,
            content: answer,
        });
    }

    /// The alternation-valid slice of recent history: complete
    /// (user, assistant) pairs only, oldest first.
    pub async fn window(&self, session_id: &str, max_turns: usize) -> Vec<(String, String)> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|turns| alternating_pairs(turns, max_turns))
            .unwrap_or_default()
    }

    /// Empty a session's history without deleting the session. Returns
    /// whether the session was known.
    pub async fn clear(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(turns) => {
                turns.clear();
                true
            }
            None => false,
        }
    }

    pub async fn turn_count(&self, session_id: &str) -> usize {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map_or(0, Vec::len)
    }
}

/// Reduce raw history to well-formed pairs.
///
/// Takes at most the last `max_turns` turns, drops a leading assistant turn
/// left over from the cut, then walks two at a time keeping only exact
/// (user, assistant) pairs. A malformed or unpaired tail is discarded rather
/// than partially included.
fn alternating_pairs(turns: &[Turn], max_turns: usize) -> Vec<(String, String)> {
    let start = turns.len().saturating_sub(max_turns);
    let mut recent = &turns[start..];

    if let Some(first) = recent.first() {
        if first.role == TurnRole::Assistant {
            recent = &recent[1..];
        }
    }

    let mut pairs = Vec::new();
    for pair in recent.chunks(2) {
        if let [question, answer] = pair {
            if question.role == TurnRole::User && answer.role == TurnRole::Assistant {
                pairs.push((question.content.clone(), answer.content.clone()));
            }
        }
    }

    pairs
}
