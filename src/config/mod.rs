//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `PROPOSAL_ENGINE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use proposal_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Primary provider: {}", config.ai.provider);
//! ```

mod ai;
mod error;
mod generation;
mod logging;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use generation::GenerationConfig;
pub use logging::{LogFormat, LoggingConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults except provider credentials, which
/// [`AppConfig::validate()`] requires for the primary provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// LLM provider configuration (primary, fallbacks, limits)
    #[serde(default)]
    pub ai: AiConfig,

    /// Log level and output format
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prompt and schema settings
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PROPOSAL_ENGINE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PROPOSAL_ENGINE__AI__PROVIDER=openai` -> `ai.provider = openai`
    /// - `PROPOSAL_ENGINE__AI__FALLBACK_PROVIDERS=groq,azure` -> `ai.fallback_providers`
    /// - `PROPOSAL_ENGINE__LOGGING__FORMAT=json` -> `logging.format = json`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PROPOSAL_ENGINE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the primary provider lacks credentials
    /// or any limit is out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
