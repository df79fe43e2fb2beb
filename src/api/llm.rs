//! Chat-completion client for the LLM providers the pipeline consults.
//!
//! OpenAI, Perplexity and Grok (xAI) all expose an OpenAI-compatible
//! `/chat/completions` endpoint, so one client covers the three. The
//! pipeline only needs text in and (usually JSON) text out.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

const INITIAL_BACKOFF_MS: u64 = 500;

/// Opaque text-completion collaborator
#[async_trait]
pub trait TextCompletion: Send + Sync {
    fn provider_name(&self) -> &str;
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Perplexity,
    Grok,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Perplexity => "perplexity",
            LlmProvider::Grok => "grok",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Perplexity => "https://api.perplexity.ai",
            LlmProvider::Grok => "https://api.x.ai/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Perplexity => "sonar",
            LlmProvider::Grok => "grok-3-mini",
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Perplexity => "PERPLEXITY_API_KEY",
            LlmProvider::Grok => "XAI_API_KEY",
        }
    }

    /// Only OpenAI honours `response_format: json_object`
    fn supports_json_mode(&self) -> bool {
        matches!(self, LlmProvider::OpenAi)
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "perplexity" => Ok(LlmProvider::Perplexity),
            "grok" | "xai" => Ok(LlmProvider::Grok),
            other => anyhow::bail!("Unknown LLM provider: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl LlmConfig {
    pub fn new(provider: LlmProvider, api_key: String) -> Self {
        Self {
            provider,
            api_key,
            base_url: provider.base_url().to_string(),
            model: provider.default_model().to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }

    /// Key from the provider's variable; `LLM_MODEL` overrides the model
    pub fn from_env(provider: LlmProvider) -> Result<Self> {
        let api_key = std::env::var(provider.api_key_var())
            .with_context(|| format!("{} not set", provider.api_key_var()))?;
        let mut config = Self::new(provider, api_key);
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.model = model;
        }
        Ok(config)
    }
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
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create LLM HTTP client")?;
        Ok(Self { config, client })
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.config.base_url);
        self.client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.config.provider))
    }
}

#[async_trait]
impl TextCompletion for LlmClient {
    fn provider_name(&self) -> &str {
        self.config.provider.as_str()
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
            response_format: self
                .config
                .provider
                .supports_json_mode()
                .then_some(ResponseFormat {
                    kind: "json_object",
                }),
        };

        let mut attempt = 0;
        loop {
            debug!(
                "Sending {} chat request (attempt {})",
                self.config.provider,
                attempt + 1
            );

            let retryable = match self.send_once(&request).await {
                Ok(response) if response.status().is_success() => {
                    let body: ChatResponse = response
                        .json()
                        .await
                        .context("Failed to parse chat completion response")?;
                    return body
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.message.content)
                        .filter(|c| !c.trim().is_empty())
                        .with_context(|| format!("{} returned an empty completion", self.config.provider));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let error = anyhow::anyhow!("{} API error: {} - {}", self.config.provider, status, body);
                    if status.as_u16() == 429 || status.is_server_error() {
                        error
                    } else {
                        return Err(error);
                    }
                }
                Err(e) => e,
            };

            if attempt >= self.config.max_retries {
                return Err(retryable);
            }
            let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
            warn!("{}; retrying in {:?}", retryable, backoff);
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

/// Pull the first JSON object out of a completion that may be wrapped in
/// markdown fences or prose
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&trimmed[start..=end]) {
        Ok(value @ serde_json::Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Ask for a completion and parse it as a JSON object
pub async fn complete_json(
    llm: &dyn TextCompletion,
    system: &str,
    user: &str,
) -> Result<serde_json::Value> {
    let text = llm.complete(system, user).await?;
    extract_json_object(&text).with_context(|| {
        format!(
            "{} did not return a JSON object: {}",
            llm.provider_name(),
            text.chars().take(200).collect::<String>()
        )
    })
}
