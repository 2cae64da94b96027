//! Completion client: one prompt in, one trimmed answer out.
//!
//! The classifier and analyzer depend only on [`CompletionBackend`], so they
//! run unchanged against the HTTP [`CompletionClient`] or a scripted backend
//! in tests. All prompt text lives in [`crate::prompts`].
//!
//! ## Call policy
//!
//! Each call is a single attempt bounded by `api_timeout_secs`. There is no
//! retry and no cancellation once the request is sent: a timeout or non-2xx
//! status surfaces as [`ThesisError::Transport`] and the caller decides what
//! that means (the classifier degrades the slide, the analyzer aborts).

use crate::config::ThesisConfig;
use crate::error::ThesisError;
use crate::prompts::system_prompt_for;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Anything that can turn a prompt into a completion.
pub trait CompletionBackend: Send + Sync {
    /// Send `prompt` as the user turn and return the answer text.
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        max_tokens: u32,
    ) -> BoxFuture<'a, Result<String, ThesisError>>;
}

/// OpenAI-compatible chat-completion client.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl CompletionClient {
    /// Build a client from the run configuration.
    ///
    /// Fails with [`ThesisError::Configuration`] when no API key is set, so
    /// no request is ever sent without a credential.
    pub fn new(config: &ThesisConfig) -> Result<Self, ThesisError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ThesisError::Configuration(format!(
                    "{} is not set. Export it or put it in a .env file.",
                    crate::config::API_KEY_ENV
                ))
            })?
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ThesisError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, prompt: &str, max_tokens: u32) -> Result<String, ThesisError> {
        let start = Instant::now();
        let system = system_prompt_for(prompt);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens,
            top_p: self.top_p,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ThesisError::Transport {
                detail: if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ThesisError::Transport {
                detail: format!("HTTP {status}: {}", text.trim()),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ThesisError::ResponseShape {
            detail: format!("invalid response format: {e}"),
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| ThesisError::ResponseShape {
                detail: "invalid response format: missing choices[0].message.content".into(),
            })?;

        debug!(
            "Completion: {} prompt chars → {} answer chars in {:?}",
            prompt.len(),
            content.len(),
            start.elapsed()
        );
        Ok(content.trim().to_string())
    }
}

impl CompletionBackend for CompletionClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        max_tokens: u32,
    ) -> BoxFuture<'a, Result<String, ThesisError>> {
        Box::pin(self.send(prompt, max_tokens))
    }
}
