use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

use super::chat_message::SourceScope;

stored_object!(TrendingQuestion, "trending_question", {
    question: String,
    count: i64,
    scope: SourceScope,
    application: Option<String>
});

impl TrendingQuestion {
    pub fn new(
        question: String,
        count: i64,
        scope: SourceScope,
        application: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            question,
            count,
            scope,
            application,
        }
    }

    /// Swap the stored trends for one scope with a freshly computed batch.
    pub async fn replace_for_scope(
        db: &SurrealDbClient,
        scope: SourceScope,
        entries: Vec<Self>,
    ) -> Result<(), AppError> {
        db.client
            .query("DELETE type::table($table) WHERE scope = $scope")
            .bind(("table", Self::table_name()))
            .bind(("scope", scope.as_str()))
            .await?;

        for entry in entries {
            db.store_item(entry).await?;
        }

        Ok(())
    }

    /// Most frequent questions for a scope, highest count first.
    pub async fn top(
        db: &SurrealDbClient,
        limit: usize,
        scope: SourceScope,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = match scope {
            SourceScope::All => {
                db.client
                    .query(
                        "SELECT * FROM type::table($table) \
                         ORDER BY count DESC, updated_at DESC LIMIT $limit",
                    )
                    .bind(("table", Self::table_name()))
                    .bind(("limit", limit))
                    .await?
            }
            SourceScope::User | SourceScope::Admin => {
                db.client
                    .query(
                        "SELECT * FROM type::table($table) WHERE scope = $scope \
                         ORDER BY count DESC, updated_at DESC LIMIT $limit",
                    )
                    .bind(("table", Self::table_name()))
                    .bind(("scope", scope.as_str()))
                    .bind(("limit", limit))
                    .await?
            }
        };

        let trends: Vec<Self> = response.take(0)?;
        Ok(trends)
    }
}
