use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
    Client,
};
use common::{
    error::AppError,
    utils::config::{AppConfig, CompletionMode},
};
use tracing::warn;

use crate::prompt::{PromptMessage, PromptRole};

/// Client for the text-generation backends.
///
/// Backend selection is static configuration resolved once at startup into an
/// ordered list of attempts; the fallback chain is the only retry there is,
/// so per-attempt HTTP retries are disabled. The full response is awaited,
/// no streaming.
pub struct CompletionClient {
    inner: CompletionInner,
}

enum CompletionInner {
    Remote { attempts: Vec<Backend> },
    #[cfg(any(test, feature = "test-utils"))]
    Canned {
        replies: std::sync::Mutex<std::collections::VecDeque<String>>,
    },
}

struct Backend {
    label: &'static str,
    endpoint: String,
    client: Client<OpenAIConfig>,
}

impl CompletionClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            // Generation is slow; the timeout is the only bound on a call
            .timeout(Duration::from_secs(config.completion_timeout_secs))
            .build()?;
        // First attempt always runs; nothing is retried past it
        let no_retry = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..backoff::ExponentialBackoff::default()
        };

        let local_backend = || Backend {
            label: "local",
            endpoint: config.local_completion_url.clone(),
            client: Client::build(
                http_client.clone(),
                OpenAIConfig::new().with_api_base(&config.local_completion_url),
                no_retry.clone(),
            ),
        };
        let hosted_backend = |api_key: &str| Backend {
            label: "hosted",
            endpoint: config.hosted_base_url.clone(),
            client: Client::build(
                http_client.clone(),
                OpenAIConfig::new()
                    .with_api_base(&config.hosted_base_url)
                    .with_api_key(api_key),
                no_retry.clone(),
            ),
        };

        let attempts = match config.completion_mode {
            CompletionMode::Local => vec![local_backend()],
            CompletionMode::Hosted => {
                let api_key = config.hosted_api_key.as_deref().ok_or_else(|| {
                    AppError::Validation(
                        "completion_mode 'hosted' requires hosted_api_key".to_string(),
                    )
                })?;
                vec![hosted_backend(api_key)]
            }
            CompletionMode::Hybrid => {
                let mut attempts = vec![local_backend()];
                // The hosted retry only exists when a credential is present
                if let Some(api_key) = config.hosted_api_key.as_deref() {
                    attempts.push(hosted_backend(api_key));
                }
                attempts
            }
        };

        Ok(Self {
            inner: CompletionInner::Remote { attempts },
        })
    }

    /// Backend labels in attempt order, for startup logging and tests.
    pub fn attempt_labels(&self) -> Vec<&'static str> {
        match &self.inner {
            CompletionInner::Remote { attempts } => {
                attempts.iter().map(|backend| backend.label).collect()
            }
            #[cfg(any(test, feature = "test-utils"))]
            CompletionInner::Canned { .. } => vec!["canned"],
        }
    }

    /// In-process backend returning queued replies, for offline tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn canned<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            inner: CompletionInner::Canned {
                replies: std::sync::Mutex::new(replies.into_iter().collect()),
            },
        }
    }

    pub async fn complete(
        &self,
        model: &str,
        messages: &[PromptMessage],
        max_tokens: u32,
    ) -> Result<String, AppError> {
        match &self.inner {
            CompletionInner::Remote { attempts } => {
                let request = build_request(model, messages, max_tokens)?;

                let mut failures: Vec<String> = Vec::new();
                for backend in attempts {
                    match backend.client.chat().create(request.clone()).await {
                        Ok(response) => return extract_content(response),
                        Err(e) => {
                            warn!(
                                backend = backend.label,
                                endpoint = %backend.endpoint,
                                "Completion attempt failed: {e}"
                            );
                            failures.push(describe_failure(backend, &e));
                        }
                    }
                }

                if let [only] = failures.as_slice() {
                    return Err(AppError::Completion(only.clone()));
                }
                Err(AppError::Completion(format!(
                    "all completion backends failed: {}",
                    failures.join("; ")
                )))
            }
            #[cfg(any(test, feature = "test-utils"))]
            CompletionInner::Canned { replies } => {
                let mut queue = replies.lock().map_err(|_| {
                    AppError::InternalError("canned reply queue poisoned".to_string())
                })?;
                queue.pop_front().ok_or_else(|| {
                    AppError::Completion("canned completion backend is out of replies".to_string())
                })
            }
        }
    }
}

fn describe_failure(backend: &Backend, error: &OpenAIError) -> String {
    match backend.label {
        "local" => format!(
            "local backend at {} failed: {error}; check that the inference server is running",
            backend.endpoint
        ),
        _ => format!("{} backend at {} failed: {error}", backend.label, backend.endpoint),
    }
}

fn build_request(
    model: &str,
    messages: &[PromptMessage],
    max_tokens: u32,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let mapped = messages
        .iter()
        .map(to_request_message)
        .collect::<Result<Vec<_>, _>>()?;

    CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(mapped)
        .max_tokens(max_tokens)
        .temperature(0.0)
        .build()
}

fn to_request_message(
    message: &PromptMessage,
) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    Ok(match message.role {
        PromptRole::System => {
            ChatCompletionRequestSystemMessage::from(message.content.clone()).into()
        }
        PromptRole::User => {
            ChatCompletionRequestUserMessage::from(message.content.clone()).into()
        }
        PromptRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
    })
}

fn extract_content(response: CreateChatCompletionResponse) -> Result<String, AppError> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .ok_or(AppError::LLMParsing(
            "No content found in LLM response".into(),
        ))
}
