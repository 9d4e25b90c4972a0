use std::sync::Arc;

use chat_pipeline::ChatPipeline;
use common::{storage::db::SurrealDbClient, utils::config::AppConfig};

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub pipeline: Arc<ChatPipeline>,
    pub config: AppConfig,
}

impl ApiState {
    pub async fn new(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Arc::new(
            SurrealDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            )
            .await?,
        );

        db.ensure_initialized().await?;

        let pipeline = Arc::new(ChatPipeline::from_config(config)?);

        Ok(Self {
            db,
            pipeline,
            config: config.clone(),
        })
    }

    /// Assemble a state from prebuilt resources. Used by tests and by the
    /// binary when it shares connections across components.
    pub fn with_resources(
        db: Arc<SurrealDbClient>,
        pipeline: Arc<ChatPipeline>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            pipeline,
            config,
        }
    }
}
