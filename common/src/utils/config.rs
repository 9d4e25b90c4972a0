use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Which completion backends are attempted, and in what order.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMode {
    Local,
    Hosted,
    Hybrid,
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScorerBackend {
    Crossencoder,
    Lexical,
}

fn default_completion_mode() -> CompletionMode {
    CompletionMode::Local
}

fn default_scorer_backend() -> ScorerBackend {
    ScorerBackend::Crossencoder
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub http_port: u16,
    #[serde(default = "default_completion_mode")]
    pub completion_mode: CompletionMode,
    #[serde(default = "default_local_completion_url")]
    pub local_completion_url: String,
    #[serde(default = "default_hosted_base_url")]
    pub hosted_base_url: String,
    #[serde(default)]
    pub hosted_api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_verifier_model")]
    pub verifier_model: String,
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,
    #[serde(default = "default_scorer_backend")]
    pub scorer_backend: ScorerBackend,
    #[serde(default = "default_scorer_url")]
    pub scorer_url: String,
    #[serde(default = "default_document_host_url")]
    pub document_host_url: String,
    #[serde(default)]
    pub smart_split: bool,
    #[serde(default = "default_trending_refresh")]
    pub trending_refresh: bool,
}

fn default_trending_refresh() -> bool {
    true
}

fn default_local_completion_url() -> String {
    "http://127.0.0.1:5263/v1".to_string()
}

fn default_hosted_base_url() -> String {
    "https://api.mistral.ai/v1".to_string()
}

fn default_chat_model() -> String {
    "mistral-small-latest".to_string()
}

fn default_verifier_model() -> String {
    "ministral-8b-latest".to_string()
}

fn default_chat_max_tokens() -> u32 {
    6000
}

fn default_completion_timeout_secs() -> u64 {
    120
}

fn default_scorer_url() -> String {
    "http://127.0.0.1:8091/score".to_string()
}

fn default_document_host_url() -> String {
    "http://127.0.0.1:8077".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "hotline".to_string(),
            surrealdb_database: "hotline".to_string(),
            http_port: 8090,
            completion_mode: default_completion_mode(),
            local_completion_url: default_local_completion_url(),
            hosted_base_url: default_hosted_base_url(),
            hosted_api_key: None,
            chat_model: default_chat_model(),
            verifier_model: default_verifier_model(),
            chat_max_tokens: default_chat_max_tokens(),
            completion_timeout_secs: default_completion_timeout_secs(),
            scorer_backend: default_scorer_backend(),
            scorer_url: default_scorer_url(),
            document_host_url: default_document_host_url(),
            smart_split: false,
            trending_refresh: true,
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
