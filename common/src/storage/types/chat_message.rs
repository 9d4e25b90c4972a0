#![allow(clippy::module_name_repetitions)]
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

#[derive(Deserialize, Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Which interface a session or message came from.
#[derive(Deserialize, Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    User,
    Admin,
}

impl Default for MessageSource {
    fn default() -> Self {
        Self::User
    }
}

/// Scope selector for queries over sourced records: one origin, or everything.
#[derive(Deserialize, Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceScope {
    User,
    Admin,
    All,
}

impl SourceScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::All => "all",
        }
    }
}

impl std::str::FromStr for SourceScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "all" => Ok(Self::All),
            other => Err(anyhow::anyhow!(
                "unknown source scope '{other}'. Expected 'user', 'admin', or 'all'."
            )),
        }
    }
}

stored_object!(ChatMessage, "chat_message", {
    session_id: String,
    role: MessageRole,
    content: String,
    parts: Option<Vec<String>>,
    files_used: Option<Vec<String>>,
    source: MessageSource
});

impl ChatMessage {
    pub fn new(
        session_id: String,
        role: MessageRole,
        content: String,
        parts: Option<Vec<String>>,
        files_used: Option<Vec<String>>,
        source: MessageSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            session_id,
            role,
            content,
            parts,
            files_used,
            source,
        }
    }

    /// User questions asked since UTC midnight, newest first. Feeds the
    /// trending analysis.
    pub async fn questions_from_today(
        db: &SurrealDbClient,
        scope: SourceScope,
    ) -> Result<Vec<String>, AppError> {
        let mut response = match scope {
            SourceScope::All => {
                db.client
                    .query(
                        "SELECT * FROM type::table($table) \
                         WHERE role = $role AND created_at >= time::floor(time::now(), 1d) \
                         ORDER BY created_at DESC",
                    )
                    .bind(("table", Self::table_name()))
                    .bind(("role", "user"))
                    .await?
            }
            SourceScope::User | SourceScope::Admin => {
                db.client
                    .query(
                        "SELECT * FROM type::table($table) \
                         WHERE role = $role AND source = $source \
                         AND created_at >= time::floor(time::now(), 1d) \
                         ORDER BY created_at DESC",
                    )
                    .bind(("table", Self::table_name()))
                    .bind(("role", "user"))
                    .bind(("source", scope.as_str()))
                    .await?
            }
        };

        let messages: Vec<ChatMessage> = response.take(0)?;
        Ok(messages.into_iter().map(|m| m.content).collect())
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}
