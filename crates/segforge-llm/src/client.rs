//! HTTP client for the text/multimodal LLM service.
//!
//! Config/timeout/reqwest-client wrapper shape kept close to the teacher's
//! `vclip-ml-client::client::MlClient`; the teacher's `with_retry`
//! exponential-backoff helper is intentionally NOT carried over — SPEC_FULL.md
//! §4.8 forbids caller-side retries for `text_chat`/`image_chat`.

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::types::{ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl};

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8100".to_string(),
            api_key: None,
            model: "default".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl LlmClientConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("LLM_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8100".to_string()),
            api_key: std::env::var("LLM_API_KEY").ok(),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "default".to_string()),
            timeout: Duration::from_secs(
                std::env::var("LLM_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}

/// The black-box contract the Job Engine's handlers call against. Kept as a
/// trait so tests can substitute a fake without spinning up `wiremock` for
/// every handler test.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn text_chat(&self, system: &str, user: &str) -> LlmResult<String>;
    async fn image_chat(&self, system: &str, user: &str, image_path: &Path) -> LlmResult<String>;
}

pub struct HttpLlmClient {
    http: Client,
    config: LlmClientConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmClientConfig) -> LlmResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> LlmResult<Self> {
        Self::new(LlmClientConfig::from_env())
    }

    async fn complete(&self, request: &ChatRequest) -> LlmResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        debug!(url = %url, model = %self.config.model, "calling LLM service");

        let mut req = self.http.post(&url).json(&serde_json::json!({
            "model": self.config.model,
            "messages": request.messages,
            "temperature": request.temperature,
        }));
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyOutput);
        }
        Ok(content)
    }

    fn detect_content_type(path: &Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "png" => "image/png",
            Some(ext) if ext == "webp" => "image/webp",
            Some(ext) if ext == "gif" => "image/gif",
            _ => "image/jpeg",
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for HttpLlmClient {
    async fn text_chat(&self, system: &str, user: &str) -> LlmResult<String> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage { role: "system", content: vec![ContentPart::Text { text: system.to_string() }] },
                ChatMessage { role: "user", content: vec![ContentPart::Text { text: user.to_string() }] },
            ],
            temperature: None,
        };
        self.complete(&request).await
    }

    async fn image_chat(&self, system: &str, user: &str, image_path: &Path) -> LlmResult<String> {
        let bytes = tokio::fs::read(image_path).await.map_err(|source| LlmError::ImageRead {
            path: image_path.display().to_string(),
            source,
        })?;
        let content_type = Self::detect_content_type(image_path);
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let data_url = format!("data:{content_type};base64,{encoded}");

        let request = ChatRequest {
            messages: vec![
                ChatMessage { role: "system", content: vec![ContentPart::Text { text: system.to_string() }] },
                ChatMessage {
                    role: "user",
                    content: vec![
                        ContentPart::Text { text: user.to_string() },
                        ContentPart::ImageUrl { image_url: ImageUrl { url: data_url } },
                    ],
                },
            ],
            temperature: None,
        };
        self.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_sane() {
        let config = LlmClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn content_type_detected_from_extension() {
        assert_eq!(HttpLlmClient::detect_content_type(Path::new("frame.png")), "image/png");
        assert_eq!(HttpLlmClient::detect_content_type(Path::new("frame.jpg")), "image/jpeg");
        assert_eq!(HttpLlmClient::detect_content_type(Path::new("frame.unknown")), "image/jpeg");
    }
}
