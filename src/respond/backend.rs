//! Text generation backends used to enhance canned replies.
//!
//! The [`TextBackend`] trait keeps the generator independent of any
//! particular model API. [`OpenAiBackend`] talks to any endpoint that
//! speaks the OpenAI `chat/completions` wire format.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BackendConfig;
use crate::models::chat::ChatEvent;
use crate::{AppError, Result};

/// Boxed future returned by [`TextBackend::complete`].
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Text in, text out. Implementations may fail or be slow; callers bound
/// them with a timeout.
pub trait TextBackend: Send + Sync {
    /// Rewrite `draft`, a reply to `event`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Generation`] on transport or protocol failure.
    fn complete<'a>(&'a self, draft: &'a str, event: &'a ChatEvent) -> CompletionFuture<'a>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    system_prompt: String,
    api_key: String,
}

impl OpenAiBackend {
    /// Build a client from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn request(&self, draft: &str, event: &ChatEvent) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: self.system_prompt.clone(),
                },
                WireMessage {
                    role: "user",
                    content: format!(
                        "Viewer {} wrote: \"{}\"\nDraft reply: \"{}\"",
                        event.user, event.text, draft
                    ),
                },
            ],
            max_tokens: 120,
            temperature: 0.8,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AppError::Generation(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Generation(format!("backend returned {status}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|err| AppError::Generation(format!("malformed response: {err}")))?;

        let content = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Generation("response had no content".into()))?;

        debug!(chars = content.chars().count(), "backend completion received");
        Ok(content)
    }
}

impl TextBackend for OpenAiBackend {
    fn complete<'a>(&'a self, draft: &'a str, event: &'a ChatEvent) -> CompletionFuture<'a> {
        Box::pin(self.request(draft, event))
    }
}
