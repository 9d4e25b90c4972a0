use tracing::error;
use uuid::Uuid;

use crate::{storage::db::SurrealDbClient, stored_object};

stored_object!(ErrorEvent, "error_event", {
    session_id: Option<String>,
    kind: String,
    detail: String
});

impl ErrorEvent {
    pub fn new(kind: String, detail: String, session_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            session_id,
            kind,
            detail,
        }
    }

    /// Best-effort persistence of a request failure. Recording an error must
    /// never produce a second one, so storage failures only log.
    pub async fn record(
        db: &SurrealDbClient,
        kind: &str,
        detail: &str,
        session_id: Option<&str>,
    ) {
        let event = Self::new(
            kind.to_string(),
            detail.to_string(),
            session_id.map(ToString::to_string),
        );

        if let Err(e) = db.store_item(event).await {
            error!(kind, "Failed to persist error event: {e}");
        }
    }
}
