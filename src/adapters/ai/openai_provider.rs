//! OpenAI-compatible Provider - AIProvider over the chat-completions API.
//!
//! One adapter serves every backend that speaks OpenAI's wire format:
//! OpenAI itself, Groq's OpenAI-compatible endpoint, and Azure OpenAI
//! deployments (which differ only in URL shape and auth header).
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::groq(api_key)
//!     .with_model("llama-3.3-70b-versatile")
//!     .with_timeout(Duration::from_secs(30));
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```
//!
//! The adapter makes a single attempt per call; retries and fallback are the
//! gateway's job.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, ProviderId,
    ProviderInfo, TokenUsage,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const AZURE_DEFAULT_API_VERSION: &str = "2023-05-15";

/// Configuration for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Which backend this endpoint belongs to.
    pub provider: ProviderId,
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model name, or deployment name for Azure.
    pub model: String,
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Azure `api-version` query parameter.
    pub api_version: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAIConfig {
    fn new(provider: ProviderId, api_key: impl Into<String>, model: &str, base_url: &str) -> Self {
        Self {
            provider,
            api_key: Secret::new(api_key.into()),
            model: model.to_string(),
            base_url: base_url.to_string(),
            api_version: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// OpenAI with `gpt-3.5-turbo`.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(ProviderId::OpenAI, api_key, "gpt-3.5-turbo", OPENAI_BASE_URL)
    }

    /// Groq with `llama-3.3-70b-versatile`.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new(ProviderId::Groq, api_key, "llama-3.3-70b-versatile", GROQ_BASE_URL)
    }

    /// An Azure OpenAI deployment.
    pub fn azure(api_key: impl Into<String>, endpoint: &str, deployment: &str) -> Self {
        let base_url = format!(
            "{}/openai/deployments/{}",
            endpoint.trim_end_matches('/'),
            deployment
        );
        let mut config = Self::new(ProviderId::Azure, api_key, deployment, &base_url);
        config.api_version = Some(AZURE_DEFAULT_API_VERSION.to_string());
        config
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the Azure API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Chat-completions client for one configured endpoint.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `AIError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match (&self.config.provider, &self.config.api_version) {
            (ProviderId::Azure, Some(version)) => {
                format!("{}/chat/completions?api-version={}", base, version)
            }
            _ => format!("{}/chat/completions", base),
        }
    }

    /// Converts our request to the wire format.
    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref prompt) = request.system_prompt {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(prompt.clone()),
            });
        }

        for msg in &request.messages {
            messages.push(OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: Some(msg.content.clone()),
            });
        }

        OpenAIRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        let builder = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&self.to_openai_request(request));

        let builder = match self.config.provider {
            ProviderId::Azure => builder.header("api-key", self.config.api_key()),
            ProviderId::OpenAI | ProviderId::Groq => {
                builder.header("Authorization", format!("Bearer {}", self.config.api_key()))
            }
        };

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AIError::timeout(self.config.timeout)
            } else if e.is_connect() {
                AIError::network(format!("Connection failed: {}", e))
            } else {
                AIError::network(e.to_string())
            }
        })
    }

    /// Maps non-success statuses onto `AIError`.
    async fn handle_response_status(&self, response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after_header = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());
        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(AIError::AuthenticationFailed),
            429 => Err(AIError::rate_limited(
                retry_after_header.unwrap_or_else(|| Self::parse_retry_after(&error_body)),
            )),
            400 => {
                if error_body.contains("maximum context length")
                    || error_body.contains("context_length_exceeded")
                {
                    Err(AIError::ContextTooLong(error_body))
                } else {
                    Err(AIError::InvalidRequest(error_body))
                }
            }
            500..=599 => Err(AIError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            _ => Err(AIError::network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }

    /// Extracts "try again in Ns" from an error body; 30 seconds otherwise.
    fn parse_retry_after(error_body: &str) -> u32 {
        const MARKER: &str = "try again in ";

        serde_json::from_str::<serde_json::Value>(error_body)
            .ok()
            .and_then(|parsed| {
                let message = parsed.get("error")?.get("message")?.as_str()?.to_string();
                let rest = &message[message.find(MARKER)? + MARKER.len()..];
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse::<u32>().ok()
            })
            .unwrap_or(30)
    }

    async fn parse_response(&self, response: Response) -> Result<CompletionResponse, AIError> {
        let response = self.handle_response_status(response).await?;

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AIError::parse("No choices in response"))?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        let usage = openai_response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: openai_response.model.unwrap_or_else(|| self.config.model.clone()),
            finish_reason,
        })
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_request(&request).await?;
        self.parse_response(response).await
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(self.config.provider, &self.config.model)
    }
}

// ----- Wire Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: Option<String>,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MessageRole;

    #[test]
    fn config_builder_works() {
        let config = OpenAIConfig::openai("test-key")
            .with_model("gpt-4o")
            .with_base_url("https://custom.api.com")
            .with_timeout(Duration::from_secs(10));

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn provider_defaults() {
        let openai = OpenAIConfig::openai("k");
        let groq = OpenAIConfig::groq("k");

        assert_eq!(openai.model, "gpt-3.5-turbo");
        assert_eq!(groq.model, "llama-3.3-70b-versatile");
        assert_eq!(groq.base_url, GROQ_BASE_URL);
        assert_eq!(groq.provider, ProviderId::Groq);
    }

    #[test]
    fn azure_url_includes_deployment_and_version() {
        let provider =
            OpenAIProvider::new(OpenAIConfig::azure("k", "https://acme.openai.azure.com/", "proposals"))
                .unwrap();

        assert_eq!(
            provider.completions_url(),
            "https://acme.openai.azure.com/openai/deployments/proposals/chat/completions?api-version=2023-05-15"
        );
        assert_eq!(provider.provider_info().model, "proposals");
    }

    #[test]
    fn openai_url_has_no_query() {
        let provider = OpenAIProvider::new(OpenAIConfig::openai("k").with_base_url("http://localhost/v1/")).unwrap();

        assert_eq!(provider.completions_url(), "http://localhost/v1/chat/completions");
    }

    #[test]
    fn system_prompt_leads_the_messages() {
        let provider = OpenAIProvider::new(OpenAIConfig::groq("k")).unwrap();
        let request = CompletionRequest::new()
            .with_system_prompt("Rules")
            .with_message(MessageRole::User, "Notes")
            .with_max_tokens(500);

        let wire = serde_json::to_value(provider.to_openai_request(&request)).unwrap();

        assert_eq!(wire["model"], "llama-3.3-70b-versatile");
        assert_eq!(wire["messages"][0]["role"], "system");
        assert_eq!(wire["messages"][1]["content"], "Notes");
        assert_eq!(wire["max_tokens"], 500);
        assert!(wire.get("temperature").is_none());
    }

    #[test]
    fn parse_retry_after_from_message() {
        let error = r#"{"error":{"message":"Rate limit exceeded. Please try again in 12 seconds."}}"#;
        assert_eq!(OpenAIProvider::parse_retry_after(error), 12);
    }

    #[test]
    fn parse_retry_after_default() {
        let error = r#"{"error":{"message":"Something went wrong"}}"#;
        assert_eq!(OpenAIProvider::parse_retry_after(error), 30);
        assert_eq!(OpenAIProvider::parse_retry_after("not json"), 30);
    }
}
