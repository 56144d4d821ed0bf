//! AI provider configuration

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use super::error::ValidationError;
use crate::ports::ProviderId;

/// AI provider configuration
///
/// One primary provider plus an ordered fallback chain. Credentials for
/// every provider may be present; only the primary's are required.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Primary provider
    #[serde(default = "default_provider", deserialize_with = "provider_id")]
    pub provider: ProviderId,

    /// Providers tried in order once the primary is exhausted (comma-separated)
    #[serde(default, deserialize_with = "provider_list")]
    pub fallback_providers: Vec<ProviderId>,

    /// Groq API key
    pub groq_api_key: Option<Secret<String>>,

    /// Groq model override
    pub groq_model: Option<String>,

    /// OpenAI API key
    pub openai_api_key: Option<Secret<String>>,

    /// OpenAI model override
    pub openai_model: Option<String>,

    /// OpenAI-compatible base URL override
    pub openai_base_url: Option<String>,

    /// Azure OpenAI API key
    pub azure_api_key: Option<Secret<String>>,

    /// Azure resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub azure_endpoint: Option<String>,

    /// Azure deployment name (used as the model name)
    pub azure_deployment: Option<String>,

    /// Azure API version override
    pub azure_api_version: Option<String>,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts per provider
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Default completion length
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Default sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Backoff unit in milliseconds
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

fn default_provider() -> ProviderId {
    ProviderId::Groq
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn provider_id<'de, D>(deserializer: D) -> Result<ProviderId, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Accepts either a sequence or a comma-separated string.
fn provider_list<'de, D>(deserializer: D) -> Result<Vec<ProviderId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    let names = match Raw::deserialize(deserializer)? {
        Raw::List(names) => names,
        Raw::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };
    names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.parse().map_err(serde::de::Error::custom))
        .collect()
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_ref().is_some_and(|v| !v.trim().is_empty())
}

fn non_empty_secret(value: &Option<Secret<String>>) -> bool {
    value
        .as_ref()
        .is_some_and(|v| !v.expose_secret().trim().is_empty())
}

impl AiConfig {
    /// Per-attempt timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff unit as Duration
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    /// API key for a provider, if one is set
    pub fn api_key(&self, provider: ProviderId) -> Option<&Secret<String>> {
        match provider {
            ProviderId::Groq => self.groq_api_key.as_ref(),
            ProviderId::OpenAI => self.openai_api_key.as_ref(),
            ProviderId::Azure => self.azure_api_key.as_ref(),
        }
    }

    /// Check whether everything needed to call a provider is present
    pub fn has_credentials(&self, provider: ProviderId) -> bool {
        match provider {
            ProviderId::Groq => non_empty_secret(&self.groq_api_key),
            ProviderId::OpenAI => non_empty_secret(&self.openai_api_key),
            ProviderId::Azure => {
                non_empty_secret(&self.azure_api_key)
                    && non_empty(&self.azure_endpoint)
                    && non_empty(&self.azure_deployment)
            }
        }
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_credentials(self.provider) {
            return Err(ValidationError::MissingCredentials(self.provider));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_retries == 0 {
            return Err(ValidationError::InvalidMaxRetries);
        }
        if self.max_tokens == 0 {
            return Err(ValidationError::InvalidMaxTokens);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidTemperature(self.temperature));
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            fallback_providers: Vec::new(),
            groq_api_key: None,
            groq_model: None,
            openai_api_key: None,
            openai_model: None,
            openai_base_url: None,
            azure_api_key: None,
            azure_endpoint: None,
            azure_deployment: None,
            azure_api_version: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}
