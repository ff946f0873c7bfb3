//! HTTP client for the OpenAI chat-completions and Anthropic messages APIs.

use std::time::Duration;

use apidrift_core::{Model, Provider};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::{LlmError, LlmResult};
use crate::prompts::Prompt;

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Provider credentials and HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_endpoint: String,
    pub anthropic_endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Completion token cap sent to Anthropic, which requires one.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_endpoint: OPENAI_ENDPOINT.to_string(),
            anthropic_endpoint: ANTHROPIC_ENDPOINT.to_string(),
            timeout_secs: 300,
            max_tokens: 8192,
        }
    }
}

impl LlmConfig {
    /// Non-empty API key for `provider`, if configured.
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::OpenAi => self.openai_api_key.as_deref(),
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

/// Shared chat client; cheap to reuse across units.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("apidrift/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send `prompt` to `model` and return the reply text.
    #[instrument(skip_all, fields(model = %model, provider = %model.provider()))]
    pub async fn complete(&self, model: Model, prompt: &Prompt) -> LlmResult<String> {
        let provider = model.provider();
        let key = self
            .config
            .api_key(provider)
            .ok_or(LlmError::MissingKey(provider))?;

        let request = match provider {
            Provider::OpenAi => self
                .http
                .post(&self.config.openai_endpoint)
                .bearer_auth(key)
                .json(&openai_body(model, prompt)),
            Provider::Anthropic => self
                .http
                .post(&self.config.anthropic_endpoint)
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&anthropic_body(model, prompt, self.config.max_tokens)),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let text = match provider {
            Provider::OpenAi => parse_openai(&body)?,
            Provider::Anthropic => parse_anthropic(&body)?,
        };
        debug!(reply_len = text.len(), "completion received");
        Ok(text)
    }
}

/// Request body for the chat-completions API.
///
/// Reasoning models take the whole prompt as one user message and no
/// sampling parameters.
pub fn openai_body(model: Model, prompt: &Prompt) -> Value {
    if model.is_reasoning() {
        json!({
            "model": model.api_id(),
            "messages": [{ "role": "user", "content": prompt.combined() }],
        })
    } else {
        json!({
            "model": model.api_id(),
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": 0.0,
        })
    }
}

/// Request body for the messages API.
pub fn anthropic_body(model: Model, prompt: &Prompt, max_tokens: u32) -> Value {
    json!({
        "model": model.api_id(),
        "max_tokens": max_tokens,
        "system": prompt.system,
        "messages": [{ "role": "user", "content": prompt.user }],
    })
}

pub fn parse_openai(body: &str) -> LlmResult<String> {
    let provider = Provider::OpenAi;
    let response: OpenAiResponse = serde_json::from_str(body)
        .map_err(|source| LlmError::Decode { provider, source })?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::EmptyResponse { provider })
}

pub fn parse_anthropic(body: &str) -> LlmResult<String> {
    let provider = Provider::Anthropic;
    let response: AnthropicResponse = serde_json::from_str(body)
        .map_err(|source| LlmError::Decode { provider, source })?;
    let text: String = response
        .content
        .into_iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text)
        .collect::<Vec<_>>()
        .join("\n");
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse { provider });
    }
    Ok(text)
}
