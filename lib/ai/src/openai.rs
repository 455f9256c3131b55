//! OpenAI-compatible chat completion backend.
//!
//! Works with any endpoint that implements `POST /chat/completions`
//! (OpenRouter, OpenAI, local gateways).

use crate::backend::CompletionBackend;
use crate::error::{BackendError, CompletionFailure};
use async_trait::async_trait;
use chat_relay_conversation::Message;
use chat_relay_credential::ApiKey;
use reqwest::StatusCode;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default completion endpoint base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "google/gemma-3-27b-it:free";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ProviderError>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

/// Backend for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend for the given base URL and model.
    ///
    /// `timeout` bounds each request; a timed-out request is reported as
    /// [`CompletionFailure::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute HTTP(S) URL or the
    /// HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> chat_relay_core::Result<Self, BackendError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| BackendError::InvalidConfig {
            reason: format!("invalid base URL '{base_url}': {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendError::InvalidConfig {
                reason: format!("unsupported URL scheme '{}'", parsed.scheme()),
            }
            .into());
        }

        let model = model.into();
        if model.trim().is_empty() {
            return Err(BackendError::InvalidConfig {
                reason: "model name is empty".to_string(),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: chat_completions_url(base_url),
            model,
        })
    }

    /// Returns the full chat completions URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    async fn complete(
        &self,
        credential: &ApiKey,
        conversation: &[Message],
    ) -> Result<String, CompletionFailure> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: conversation,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionFailure::Timeout
                } else {
                    CompletionFailure::Transport {
                        reason: e.without_url().to_string(),
                    }
                }
            })?;

        let status = response.status();
        let retry_after = response.headers().get(RETRY_AFTER).cloned();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                CompletionFailure::Timeout
            } else {
                CompletionFailure::Transport {
                    reason: e.without_url().to_string(),
                }
            }
        })?;

        if !status.is_success() {
            return Err(classify_status(
                status,
                retry_after.as_ref(),
                &String::from_utf8_lossy(&body),
            ));
        }

        parse_completion(&body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Maps a non-success HTTP status to a failure.
fn classify_status(
    status: StatusCode,
    retry_after: Option<&HeaderValue>,
    body: &str,
) -> CompletionFailure {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionFailure::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => CompletionFailure::RateLimited {
            retry_after_secs: retry_after
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok()),
        },
        _ => CompletionFailure::status(status.as_u16(), body),
    }
}

/// Extracts the reply text from a successful response body.
fn parse_completion(body: &[u8]) -> Result<String, CompletionFailure> {
    let parsed: ChatCompletionResponse =
        serde_json::from_slice(body).map_err(|e| CompletionFailure::MalformedResponse {
            reason: e.to_string(),
        })?;

    if let Some(error) = parsed.error {
        return Err(CompletionFailure::Provider {
            message: error.message,
        });
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionFailure::MalformedResponse {
            reason: "response has no choices".to_string(),
        })?;

    choice
        .message
        .content
        .ok_or_else(|| CompletionFailure::MalformedResponse {
            reason: "first choice has no content".to_string(),
        })
}
