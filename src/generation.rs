//! Generation provider implementations.
//!
//! - **[`DisabledGenerator`]**: always fails; questions then get the
//!   degraded error answer.
//! - **[`OpenAIGenerator`]**: OpenAI-compatible `POST {url}/chat/completions`.
//! - **[`OllamaGenerator`]**: Ollama's `POST /api/chat`.
//!
//! Generation calls are never retried here; a failed call degrades the
//! answer instead.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use course_ta_core::generation::{GenerationProvider, GenerationRequest};

use crate::config::GenerationConfig;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn messages<'a>(request: &GenerationRequest<'a>) -> [ApiMessage<'a>; 2] {
    [
        ApiMessage {
            role: "system",
            content: request.system_prompt,
        },
        ApiMessage {
            role: "user",
            content: request.user_prompt,
        },
    ]
}

pub struct DisabledGenerator;

#[async_trait]
impl GenerationProvider for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String> {
        bail!("Generation provider is disabled")
    }
}

// ============ OpenAI-compatible ============

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI and compatible proxies.
pub struct OpenAIGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.api_key_env)
        })?;
        let base_url = config
            .url
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/')
            .to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let api_messages = messages(request);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(%status, body = %text, "chat completion failed");
            bail!("OpenAI API request failed (status {})", status);
        }

        parse_chat_response(&text)
    }
}

fn parse_chat_response(text: &str) -> Result<String> {
    let resp: ChatResponse = serde_json::from_str(text)?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("chat completion returned no content"))
}

// ============ Ollama ============

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_URL)
            .trim_end_matches('/')
            .to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let api_messages = messages(request);
        let body = OllamaChatRequest {
            model: &self.model,
            messages: &api_messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Ollama connection error (is Ollama running at {}?): {}", self.url, e))?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            bail!("Ollama API error {}: {}", status, text);
        }

        let resp: OllamaChatResponse = serde_json::from_str(&text)?;
        resp.message
            .content
            .ok_or_else(|| anyhow::anyhow!("Ollama returned no content"))
    }
}

/// Build the configured [`GenerationProvider`].
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_system_then_user() {
        let request = GenerationRequest {
            system_prompt: "sys",
            user_prompt: "usr",
            max_tokens: 400,
            temperature: 0.0,
        };
        let api_messages = messages(&request);
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: &api_messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["max_tokens"], 400);
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn parses_first_choice() {
        let text = r#"{"choices":[{"message":{"role":"assistant","content":"Use gpt-3.5-turbo-0125."}}]}"#;
        assert_eq!(parse_chat_response(text).unwrap(), "Use gpt-3.5-turbo-0125.");
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(parse_chat_response(r#"{"choices":[]}"#).is_err());
        assert!(parse_chat_response(r#"{"choices":[{"message":{"content":null}}]}"#).is_err());
    }

    #[tokio::test]
    async fn disabled_generator_fails() {
        let generator = create_generator(&GenerationConfig::default()).unwrap();
        let request = GenerationRequest {
            system_prompt: "",
            user_prompt: "",
            max_tokens: 1,
            temperature: 0.0,
        };
        assert!(generator.generate(&request).await.is_err());
    }
}
