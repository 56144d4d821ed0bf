//! Configuration error types

use thiserror::Error;

use crate::ports::ProviderId;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("No credentials configured for provider {0}")]
    MissingCredentials(ProviderId),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("max_retries must be at least 1")]
    InvalidMaxRetries,

    #[error("max_tokens must be greater than zero")]
    InvalidMaxTokens,

    #[error("temperature must be within [0, 2], got {0}")]
    InvalidTemperature(f32),

    #[error("Invalid log filter directive: {0}")]
    InvalidLogLevel(String),
}
