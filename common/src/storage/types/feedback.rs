use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

use super::chat_message::ChatMessage;

stored_object!(Feedback, "feedback", {
    message_id: String,
    rating: i32,
    comment: Option<String>
});

impl Feedback {
    pub fn new(message_id: String, rating: i32, comment: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            message_id,
            rating,
            comment,
        }
    }

    /// Store a rating for an answer. The target message must exist.
    pub async fn record(
        db: &SurrealDbClient,
        message_id: &str,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Self, AppError> {
        let message: Option<ChatMessage> = db.get_item(message_id).await?;
        if message.is_none() {
            return Err(AppError::NotFound(format!(
                "Message {message_id} was not found"
            )));
        }

        let feedback = Self::new(message_id.to_string(), rating, comment);
        db.store_item(feedback.clone()).await?;
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::chat_message::{MessageRole, MessageSource};

    #[tokio::test]
    async fn test_record_requires_existing_message() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb");

        let result = Feedback::record(&db, "missing", 1, None).await;
        match result {
            Err(AppError::NotFound(_)) => {}
            other => panic!("Expected NotFound error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_record_stores_rating_and_comment() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb");

        let message = ChatMessage::new(
            "session-1".to_string(),
            MessageRole::Assistant,
            "Réponse".to_string(),
            None,
            None,
            MessageSource::User,
        );
        let message_id = message.id.clone();
        db.store_item(message).await.expect("Failed to store");

        let feedback = Feedback::record(&db, &message_id, 5, Some("Merci !".to_string()))
            .await
            .expect("Failed to record feedback");

        let retrieved: Option<Feedback> = db
            .get_item(&feedback.id)
            .await
            .expect("Failed to retrieve feedback");
        let retrieved = retrieved.expect("feedback should exist");
        assert_eq!(retrieved.message_id, message_id);
        assert_eq!(retrieved.rating, 5);
        assert_eq!(retrieved.comment, Some("Merci !".to_string()));
    }
}
