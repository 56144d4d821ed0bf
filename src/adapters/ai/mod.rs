//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port and the gateway that drives them.
//!
//! ## Available Adapters
//!
//! - `MockAIProvider` - Configurable mock for testing
//! - `OpenAIProvider` - OpenAI-compatible chat completions (OpenAI, Groq, Azure OpenAI)
//! - `LlmGateway` - Retry, provider fallback and usage accounting

mod gateway;
mod mock_provider;
mod openai_provider;
mod pricing;
mod retry;

pub use gateway::{Completion, GatewayBuildError, GatewayError, LlmGateway, ProviderUsage, UsageStats};
pub use mock_provider::{MockAIProvider, MockError, MockResponse};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
pub use pricing::{estimate_cost, rate_per_1k};
pub use retry::{RetryOutcome, RetryPolicy};
