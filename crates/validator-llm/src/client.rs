// OpenRouter chat-completions client.
//
// Sends one non-streaming chat completion per check and returns the trimmed
// reply text. A single `reqwest::Client` (and so a single connection pool) is
// shared by every request, and outgoing calls are bounded by a semaphore.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::prompt::build_check_prompt;
use crate::verdict::Verdict;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "mistralai/mixtral-8x7b-instruct";
pub const DEFAULT_TEMPERATURE: f64 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;
pub const DEFAULT_APP_URL: &str = "https://your-app.com";

/// Sent as `X-Title` so requests show up under this name on OpenRouter.
pub const APP_TITLE: &str = "Data Validator Agent";

/// Upstream error bodies are cut to this many characters before logging.
const ERROR_BODY_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("request limiter closed")]
    Closed,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl LlmError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err)
        }
    }
}

// ---------------------------------------------------------------------------
// FactChecker seam
// ---------------------------------------------------------------------------

/// Anything that can turn a piece of data into a verdict.
///
/// The HTTP layer only depends on this trait, so handlers can be driven by a
/// stub in tests.
#[async_trait]
pub trait FactChecker: Send + Sync {
    async fn check(&self, data: &str) -> Result<Verdict, LlmError>;
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything the client needs to talk to the upstream model.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_concurrency: usize,
    /// Sent as `HTTP-Referer`.
    pub app_url: String,
}

impl ClientSettings {
    /// Settings with the stock OpenRouter defaults and the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: OPENROUTER_API_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            app_url: DEFAULT_APP_URL.to_string(),
        }
    }

    /// Full URL of the chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

// ---------------------------------------------------------------------------
// OpenRouterClient
// ---------------------------------------------------------------------------

pub struct OpenRouterClient {
    http: reqwest::Client,
    settings: ClientSettings,
    limiter: Arc<Semaphore>,
}

impl OpenRouterClient {
    pub fn new(settings: ClientSettings) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(LlmError::ClientBuild)?;
        let limiter = Arc::new(Semaphore::new(settings.max_concurrency));
        Ok(Self {
            http,
            settings,
            limiter,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Number of outgoing requests that could start right now.
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Stop admitting new upstream requests. In-flight requests finish;
    /// waiters and later callers get [`LlmError::Closed`].
    pub fn close(&self) {
        self.limiter.close();
    }

    /// Send `prompt` as a single user message and return the trimmed reply.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| LlmError::Closed)?;

        let body = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .http
            .post(self.settings.completions_url())
            .bearer_auth(&self.settings.api_key)
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", &self.settings.app_url)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let err = LlmError::from_reqwest(e);
                error!("OpenRouter request failed: {err}");
                err
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            let err = LlmError::from_reqwest(e);
            error!("failed to read OpenRouter response: {err}");
            err
        })?;

        if status != reqwest::StatusCode::OK {
            let body = truncate_chars(&text, ERROR_BODY_LIMIT);
            error!("OpenRouter error {}: {}", status.as_u16(), body);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match parse_completion_text(&text) {
            Some(reply) => {
                debug!(chars = reply.len(), "completion received");
                Ok(reply)
            }
            None => {
                warn!(
                    "OpenRouter reply missing choices[0].message.content: {}",
                    truncate_chars(&text, ERROR_BODY_LIMIT)
                );
                Err(LlmError::MalformedResponse(
                    "missing choices[0].message.content".to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl FactChecker for OpenRouterClient {
    async fn check(&self, data: &str) -> Result<Verdict, LlmError> {
        let prompt = build_check_prompt(data);
        let reply = self.complete(&prompt).await?;
        let verdict = Verdict::parse(&reply);
        if !verdict.is_recognized() {
            warn!("model reply did not follow CORRECT/WRONG format: {reply}");
        }
        Ok(verdict)
    }
}

// ---------------------------------------------------------------------------
// JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract the reply text from a chat completion body.
///
/// Expected shape: `{ "choices": [ { "message": { "content": "..." } } ] }`
pub(crate) fn parse_completion_text(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.trim().to_string())
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
