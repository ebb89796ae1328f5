//! OpenAI chat-completions provider for Askerbot
//!
//! One non-streaming `POST {base_url}/chat/completions` per call with a
//! system and a user message. The API key is read once at construction and
//! never logged.

#![warn(missing_docs)]
#![warn(clippy::all)]

use askerbot_core::{
    get_env_int, get_env_or, get_required_env, AskerError, CompletionProvider, CompletionRequest,
    CompletionResponse, Result, Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared HTTP client for connection pooling
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_http_client() -> Client {
    HTTP_CLIENT
        .get_or_init(|| {
            Client::builder()
                .pool_max_idle_per_host(16)
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|e| {
                    warn!("Falling back to default HTTP client: {}", e);
                    Client::new()
                })
        })
        .clone()
}

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the OpenAI API
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token
    pub api_key: String,
    /// API root, without trailing slash
    pub base_url: String,
    /// Model used when a request carries no override
    pub model: String,
    /// Transport-level timeout; callers add their own deadline on top
    pub request_timeout: Duration,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl OpenAiConfig {
    /// Config with default endpoint and model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL` and
    /// `OPENAI_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let api_key = get_required_env("OPENAI_API_KEY")?;
        Ok(Self {
            api_key,
            base_url: get_env_or("OPENAI_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: get_env_or("OPENAI_MODEL", DEFAULT_MODEL),
            request_timeout: Duration::from_secs(get_env_int("OPENAI_TIMEOUT_SECS", 30u64)),
        })
    }

    /// Point at a different API root (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Chat-completions client implementing [`CompletionProvider`]
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a provider with the shared connection pool
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: get_http_client(),
            config,
        }
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        OpenAiConfig::from_env().map(Self::new)
    }

    /// Model used when a request has no override
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_body(&self, request: &CompletionRequest) -> ChatCompletionBody {
        ChatCompletionBody {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_body(&request);
        debug!(
            purpose = ?request.purpose,
            model = %body.model,
            max_tokens = body.max_tokens,
            "sending chat completion"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AskerError::timeout(format!("OpenAI request: {}", e.without_url()))
                } else {
                    AskerError::provider(format!("OpenAI request failed: {}", e.without_url()))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(AskerError::provider(format!(
                "OpenAI API error ({}): {}",
                status.as_u16(),
                error_text.chars().take(300).collect::<String>()
            )));
        }

        let parsed: ChatCompletionReply = resp
            .json()
            .await
            .map_err(|e| AskerError::provider(format!("Unexpected OpenAI payload: {}", e)))?;

        parse_reply(parsed)
    }
}

fn parse_reply(reply: ChatCompletionReply) -> Result<CompletionResponse> {
    let text = reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AskerError::provider("OpenAI reply had no message content"))?;

    Ok(CompletionResponse {
        text,
        usage: reply.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionReply {
    #[serde(default)]
    choices: Vec<ReplyChoice>,
    usage: Option<ReplyUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}
