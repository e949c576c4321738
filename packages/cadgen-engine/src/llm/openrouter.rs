use crate::config::Settings;
use crate::error::LlmError;
use crate::llm::{ChatMessage, Completion, SamplingProfile, TextGenerator};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// OpenRouter chat-completion client. Cloning is cheap and clones share
/// the same bounded connection pool, so one client serves any number of
/// concurrent runs.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.default_model.clone(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
        profile: SamplingProfile,
    ) -> Result<Completion, LlmError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: profile.temperature.clamp(0.0, 1.0),
            max_tokens: profile.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://github.com/cadgen/cadgen")
            .header("X-Title", "cadgen - text to CAD generator")
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("response carried no choices".into()))?;

        let usage = completion.usage.unwrap_or_default();
        debug!(
            model = %self.model,
            prompt_tokens = ?usage.prompt_tokens,
            completion_tokens = ?usage.completion_tokens,
            "completion received"
        );

        Ok(Completion {
            content: content.trim().to_string(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    /// Sends the request with bounded exponential backoff on transient
    /// failures (connection errors, timeouts, HTTP 429/5xx). The last
    /// error is surfaced once the attempt budget is spent.
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        profile: SamplingProfile,
    ) -> Result<Completion, LlmError> {
        let mut attempt = 1;
        loop {
            match self.send_once(messages, profile).await {
                Ok(completion) => return Ok(completion),
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "retrying model request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn classify_transport(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Connect(err.to_string())
    }
}

/// Delay before retry number `attempt + 1`: doubles from the initial
/// value, capped.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = INITIAL_BACKOFF.saturating_mul(1 << (attempt - 1).min(8));
    exp.min(MAX_BACKOFF)
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}
