use surrealdb::opt::PatchOp;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

use super::chat_message::MessageSource;

stored_object!(ChatSession, "chat_session", {
    source: MessageSource
});

impl ChatSession {
    /// The record id is the caller-provided session identifier, so a session
    /// can be looked up without a mapping table.
    pub fn new(session_id: String, source: MessageSource) -> Self {
        let now = Utc::now();
        Self {
            id: session_id,
            created_at: now,
            updated_at: now,
            source,
        }
    }

    /// Record activity on a session, creating it on first reference.
    pub async fn touch(
        db: &SurrealDbClient,
        session_id: &str,
        source: MessageSource,
    ) -> Result<Self, AppError> {
        if let Some(existing) = db.get_item::<Self>(session_id).await? {
            let _updated: Option<Self> = db
                .update((Self::table_name(), session_id))
                .patch(PatchOp::replace(
                    "/updated_at",
                    surrealdb::Datetime::from(Utc::now()),
                ))
                .await?;
            return Ok(existing);
        }

        let session = Self::new(session_id.to_string(), source);
        db.store_item(session.clone()).await?;
        Ok(session)
    }
}
