//! Generative-text API interaction.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint (Groq by
//! default). One call per run, bounded by `llm.timeout_secs`; a failure is
//! reported to the caller and never retried.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for "send a prompt, get text back"
//! - [`ChatClient`]: the HTTP implementation used in production
//!
//! The synthesizer only depends on the trait so tests can substitute a
//! canned response.

use crate::config::{LlmConfig, is_configured};
use crate::error::SynthError;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// System message sent with every completion.
pub const SYSTEM_PROMPT: &str = "You are a professional tech journalist. \
Always respond with only valid raw JSON, no markdown, no code fences, no preamble.";

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a model and return its raw text answer.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send `text` as the user message and wait for the completion.
    async fn ask(&self, text: &str) -> Result<Self::Response, SynthError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Bearer-authenticated chat-completions client.
pub struct ChatClient<'a> {
    /// Shared HTTP client.
    pub client: &'a Client,
    /// Endpoint, model and sampling settings.
    pub config: &'a LlmConfig,
}

impl fmt::Debug for ChatClient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

impl AskAsync for ChatClient<'_> {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.config.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, SynthError> {
        if !is_configured(&self.config.api_key) {
            error!("Generative-text API key not configured");
            return Err(SynthError::NotConfigured);
        }

        let payload = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let t0 = Instant::now();
        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SynthError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let completion: ChatResponse = resp.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(SynthError::EmptyCompletion)?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = content.len(),
            "Completion received"
        );
        Ok(content)
    }
}
