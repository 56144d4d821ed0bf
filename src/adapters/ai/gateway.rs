//! LLM Gateway - retry, fallback and usage accounting over AIProvider adapters.
//!
//! The gateway owns one adapter per provider id. A call runs the full retry
//! state machine against one provider; `complete_with_fallback` walks the
//! primary and then each fallback in order, each with its own retry budget.
//!
//! Fallback never rebinds the gateway: the primary stays configured after
//! both partial and total failure, so the next unrelated call starts from the
//! primary again.
//!
//! # Example
//!
//! ```ignore
//! let gateway = LlmGateway::new(Arc::new(groq), RetryPolicy::new(3, Duration::from_secs(30)))
//!     .with_fallback_provider(Arc::new(openai));
//!
//! let completion = gateway
//!     .complete_with_fallback(&prompt, &system, &[ProviderId::OpenAI])
//!     .await?;
//! ```

use secrecy::ExposeSecret;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::openai_provider::{OpenAIConfig, OpenAIProvider};
use super::pricing::estimate_cost;
use super::retry::{RetryOutcome, RetryPolicy};
use crate::config::{AiConfig, ValidationError};
use crate::ports::{AIError, AIProvider, CompletionRequest, MessageRole, ProviderId};

const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A successful completion with its accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub tokens_used: u64,
    pub estimated_cost: f64,
    /// Provider that produced the content.
    pub provider_id: ProviderId,
    pub model: String,
    /// Attempts spent on the successful provider.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Cumulative usage across every successful call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProviderUsage {
    pub total_tokens_used: u64,
    pub total_cost: f64,
}

/// Usage snapshot for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub total_tokens_used: u64,
    /// Rounded to 4 decimal places.
    pub total_cost: f64,
    pub provider: ProviderId,
    pub model: String,
}

/// Gateway failures. Only raised once retries (and fallbacks) are spent.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("{provider} failed after {attempts} attempt(s): {last_error}")]
    AllAttemptsFailed {
        provider: ProviderId,
        attempts: u32,
        #[source]
        last_error: AIError,
    },

    #[error("all providers failed (primary {primary}, tried {}): {last_error}", format_ids(.attempted))]
    AllProvidersFailed {
        primary: ProviderId,
        attempted: Vec<ProviderId>,
        #[source]
        last_error: AIError,
    },
}

fn format_ids(ids: &[ProviderId]) -> String {
    ids.iter().map(ProviderId::as_str).collect::<Vec<_>>().join(", ")
}

impl GatewayError {
    /// The provider error that ended the run.
    pub fn last_error(&self) -> &AIError {
        match self {
            GatewayError::AllAttemptsFailed { last_error, .. }
            | GatewayError::AllProvidersFailed { last_error, .. } => last_error,
        }
    }
}

/// Errors building a gateway from configuration.
#[derive(Debug, Error)]
pub enum GatewayBuildError {
    #[error(transparent)]
    Config(#[from] ValidationError),

    #[error("failed to create {provider} client: {source}")]
    Client {
        provider: ProviderId,
        #[source]
        source: AIError,
    },
}

/// Retrying, fallback-capable front for the configured LLM providers.
pub struct LlmGateway {
    primary: ProviderId,
    providers: HashMap<ProviderId, Arc<dyn AIProvider>>,
    policy: RetryPolicy,
    max_tokens: u32,
    temperature: f32,
    usage: Mutex<ProviderUsage>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LlmGateway {
    /// Creates a gateway whose primary is `primary`'s provider id.
    pub fn new(primary: Arc<dyn AIProvider>, policy: RetryPolicy) -> Self {
        let id = primary.provider_info().provider;
        let mut providers = HashMap::new();
        providers.insert(id, primary);
        Self {
            primary: id,
            providers,
            policy,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            usage: Mutex::new(ProviderUsage::default()),
        }
    }

    /// Registers an adapter usable as a fallback.
    ///
    /// An adapter for the primary's id is ignored.
    pub fn with_fallback_provider(mut self, provider: Arc<dyn AIProvider>) -> Self {
        let id = provider.provider_info().provider;
        if id == self.primary {
            warn!(provider = %id, "Ignoring fallback adapter with the primary's id");
        } else {
            self.providers.insert(id, provider);
        }
        self
    }

    /// Sets the request defaults used when a call leaves them unset.
    pub fn with_defaults(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Builds the primary adapter and every credentialed fallback.
    ///
    /// # Errors
    ///
    /// - `Config` if the primary provider lacks credentials
    /// - `Client` if an HTTP client cannot be created
    pub fn from_config(config: &AiConfig) -> Result<Self, GatewayBuildError> {
        let primary_config = provider_config(config, config.provider)
            .ok_or(ValidationError::MissingCredentials(config.provider))?;
        let primary = build_provider(primary_config)?;

        let policy = RetryPolicy::new(config.max_retries, config.timeout())
            .with_backoff_unit(config.backoff_unit());
        let mut gateway = Self::new(primary, policy)
            .with_defaults(config.max_tokens, config.temperature);

        for &id in &config.fallback_providers {
            if id == config.provider {
                continue;
            }
            match provider_config(config, id) {
                Some(fallback) => gateway = gateway.with_fallback_provider(build_provider(fallback)?),
                None => warn!(provider = %id, "Fallback provider has no credentials, skipping"),
            }
        }

        Ok(gateway)
    }

    /// The configured primary provider.
    pub fn primary(&self) -> ProviderId {
        self.primary
    }

    /// Provider ids with a registered adapter.
    pub fn providers(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.providers.keys().copied().collect();
        ids.sort_by_key(|id| id.as_str());
        ids
    }

    /// Completes on the primary provider with bounded retries.
    ///
    /// # Errors
    ///
    /// - `AllAttemptsFailed` once the retry budget is spent or a
    ///   non-retryable error occurs
    pub async fn complete(
        &self,
        prompt: &str,
        system_instruction: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<Completion, GatewayError> {
        let request = self.request(prompt, system_instruction, max_tokens, temperature);
        let provider = Arc::clone(&self.providers[&self.primary]);
        self.run(self.primary, provider, request).await
    }

    /// Tries the primary, then each fallback in order, until one succeeds.
    ///
    /// Ids without a registered adapter are skipped, as are the primary and
    /// repeated ids, so no provider runs its retry budget twice. When no
    /// fallback is left to try the primary's `AllAttemptsFailed` is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - `AllProvidersFailed` when every attempted provider is exhausted
    pub async fn complete_with_fallback(
        &self,
        prompt: &str,
        system_instruction: &str,
        fallback_providers: &[ProviderId],
    ) -> Result<Completion, GatewayError> {
        let request = self.request(prompt, system_instruction, None, None);
        let primary = Arc::clone(&self.providers[&self.primary]);

        let primary_error = match self.run(self.primary, primary, request.clone()).await {
            Ok(completion) => return Ok(completion),
            Err(err) if fallback_providers.is_empty() => return Err(err),
            Err(err) => err,
        };

        let mut attempted = vec![self.primary];
        let mut last_error = primary_error.last_error().clone();

        for &id in fallback_providers {
            if attempted.contains(&id) {
                debug!(provider = %id, "Provider already attempted, skipping");
                continue;
            }
            let Some(provider) = self.providers.get(&id) else {
                warn!(provider = %id, "No adapter registered for fallback provider, skipping");
                continue;
            };
            warn!(
                from = %attempted[attempted.len() - 1],
                to = %id,
                error = %last_error,
                "Falling back to next provider"
            );
            attempted.push(id);
            match self.run(id, Arc::clone(provider), request.clone()).await {
                Ok(completion) => return Ok(completion),
                Err(err) => last_error = err.last_error().clone(),
            }
        }

        if attempted.len() == 1 {
            return Err(primary_error);
        }

        warn!(primary = %self.primary, attempted = %format_ids(&attempted), "All providers failed");
        Err(GatewayError::AllProvidersFailed {
            primary: self.primary,
            attempted,
            last_error,
        })
    }

    /// Cumulative usage.
    pub fn usage(&self) -> ProviderUsage {
        *lock(&self.usage)
    }

    /// Cumulative usage with the primary's identity.
    pub fn usage_stats(&self) -> UsageStats {
        let usage = self.usage();
        let info = self.providers[&self.primary].provider_info();
        UsageStats {
            total_tokens_used: usage.total_tokens_used,
            total_cost: (usage.total_cost * 10_000.0).round() / 10_000.0,
            provider: info.provider,
            model: info.model,
        }
    }

    fn request(
        &self,
        prompt: &str,
        system_instruction: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> CompletionRequest {
        CompletionRequest::new()
            .with_system_prompt(system_instruction)
            .with_message(MessageRole::User, prompt)
            .with_max_tokens(max_tokens.unwrap_or(self.max_tokens))
            .with_temperature(temperature.unwrap_or(self.temperature))
    }

    async fn run(
        &self,
        id: ProviderId,
        provider: Arc<dyn AIProvider>,
        request: CompletionRequest,
    ) -> Result<Completion, GatewayError> {
        let started = Instant::now();
        let outcome = self
            .policy
            .execute(|_| {
                let provider = Arc::clone(&provider);
                let request = request.clone();
                async move { provider.complete(request).await }
            })
            .await;

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                let tokens_used = u64::from(value.usage.total_tokens);
                let estimated_cost = estimate_cost(id, &value.model, tokens_used);
                self.record_usage(tokens_used, estimated_cost);

                let elapsed = started.elapsed();
                info!(
                    provider = %id,
                    model = %value.model,
                    attempts,
                    tokens_used,
                    estimated_cost,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "LLM completion succeeded"
                );
                Ok(Completion {
                    content: value.content,
                    tokens_used,
                    estimated_cost,
                    provider_id: id,
                    model: value.model,
                    attempts,
                    elapsed,
                })
            }
            RetryOutcome::Exhausted { attempts, last_error } => {
                warn!(provider = %id, attempts, error = %last_error, "LLM provider exhausted");
                Err(GatewayError::AllAttemptsFailed {
                    provider: id,
                    attempts,
                    last_error,
                })
            }
        }
    }

    fn record_usage(&self, tokens: u64, cost: f64) {
        let mut usage = lock(&self.usage);
        usage.total_tokens_used += tokens;
        usage.total_cost += cost;
    }
}

/// Adapter configuration for a provider, if its credentials are present.
fn provider_config(config: &AiConfig, id: ProviderId) -> Option<OpenAIConfig> {
    if !config.has_credentials(id) {
        return None;
    }
    let key = config.api_key(id)?.expose_secret().clone();

    let adapter = match id {
        ProviderId::Groq => {
            let adapter = OpenAIConfig::groq(key);
            match &config.groq_model {
                Some(model) => adapter.with_model(model.clone()),
                None => adapter,
            }
        }
        ProviderId::OpenAI => {
            let mut adapter = OpenAIConfig::openai(key);
            if let Some(model) = &config.openai_model {
                adapter = adapter.with_model(model.clone());
            }
            if let Some(url) = &config.openai_base_url {
                adapter = adapter.with_base_url(url.clone());
            }
            adapter
        }
        ProviderId::Azure => {
            let endpoint = config.azure_endpoint.as_deref()?;
            let deployment = config.azure_deployment.as_deref()?;
            let adapter = OpenAIConfig::azure(key, endpoint, deployment);
            match &config.azure_api_version {
                Some(version) => adapter.with_api_version(version.clone()),
                None => adapter,
            }
        }
    };

    Some(adapter.with_timeout(config.timeout()))
}

fn build_provider(config: OpenAIConfig) -> Result<Arc<dyn AIProvider>, GatewayBuildError> {
    let provider = config.provider;
    OpenAIProvider::new(config)
        .map(|p| Arc::new(p) as Arc<dyn AIProvider>)
        .map_err(|source| GatewayBuildError::Client { provider, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::ports::{FinishReason, TokenUsage};
    use secrecy::Secret;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(1)).with_backoff_unit(Duration::from_millis(1))
    }

    fn unavailable() -> MockError {
        MockError::Unavailable {
            message: "down".to_string(),
        }
    }

    fn failing(provider: ProviderId) -> MockAIProvider {
        MockAIProvider::new()
            .with_provider(provider, "failing-model")
            .with_persistent_error(unavailable())
    }

    #[tokio::test]
    async fn complete_records_tokens_and_cost() {
        let mock = MockAIProvider::new().with_response("Executive summary");
        let gateway = LlmGateway::new(Arc::new(mock.clone()), fast_policy());

        let completion = gateway.complete("notes", "system", None, None).await.unwrap();

        assert_eq!(completion.content, "Executive summary");
        assert_eq!(completion.tokens_used, 30);
        assert_eq!(completion.provider_id, ProviderId::OpenAI);
        assert_eq!(completion.attempts, 1);
        assert!((completion.estimated_cost - 0.00006).abs() < 1e-12);
        assert_eq!(gateway.usage().total_tokens_used, 30);
    }

    #[tokio::test]
    async fn request_carries_prompts_and_defaults() {
        let mock = MockAIProvider::new();
        let gateway =
            LlmGateway::new(Arc::new(mock.clone()), fast_policy()).with_defaults(256, 0.1);

        gateway.complete("user prompt", "system text", None, Some(0.9)).await.unwrap();

        let request = &mock.get_calls()[0];
        assert_eq!(request.system_prompt.as_deref(), Some("system text"));
        assert_eq!(request.messages[0].content, "user prompt");
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.9));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_and_not_billed() {
        let mock = MockAIProvider::new()
            .with_error(unavailable())
            .with_error(MockError::RateLimited { retry_after_secs: 0 })
            .with_response("third time");
        let gateway = LlmGateway::new(Arc::new(mock.clone()), fast_policy());

        let completion = gateway.complete("p", "s", None, None).await.unwrap();

        assert_eq!(completion.attempts, 3);
        assert_eq!(mock.call_count(), 3);
        assert_eq!(gateway.usage().total_tokens_used, 30);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts_and_last_error() {
        let mock = failing(ProviderId::Groq);
        let gateway = LlmGateway::new(Arc::new(mock.clone()), fast_policy());

        let err = gateway.complete("p", "s", None, None).await.unwrap_err();

        assert!(matches!(
            err,
            GatewayError::AllAttemptsFailed {
                provider: ProviderId::Groq,
                attempts: 3,
                last_error: AIError::Unavailable { .. },
            }
        ));
        assert_eq!(mock.call_count(), 3);
        assert_eq!(gateway.usage(), ProviderUsage::default());
    }

    #[tokio::test]
    async fn fallback_succeeds_without_rebinding_primary() {
        let primary = failing(ProviderId::OpenAI);
        let backup = MockAIProvider::new()
            .with_provider(ProviderId::Groq, "llama")
            .with_response("from groq");
        let gateway = LlmGateway::new(Arc::new(primary.clone()), fast_policy())
            .with_fallback_provider(Arc::new(backup.clone()));

        let completion = gateway
            .complete_with_fallback("p", "s", &[ProviderId::Groq])
            .await
            .unwrap();

        assert_eq!(completion.content, "from groq");
        assert_eq!(completion.provider_id, ProviderId::Groq);
        assert_eq!(gateway.primary(), ProviderId::OpenAI);

        // The next call still goes to the primary.
        let _ = gateway.complete("p", "s", None, None).await;
        assert_eq!(primary.call_count(), 6);
        assert_eq!(backup.call_count(), 1);
    }

    #[tokio::test]
    async fn total_failure_lists_every_attempted_provider() {
        let gateway = LlmGateway::new(Arc::new(failing(ProviderId::OpenAI)), fast_policy())
            .with_fallback_provider(Arc::new(failing(ProviderId::Groq)))
            .with_fallback_provider(Arc::new(failing(ProviderId::Azure)));

        let err = gateway
            .complete_with_fallback("p", "s", &[ProviderId::Groq, ProviderId::Azure])
            .await
            .unwrap_err();

        match err {
            GatewayError::AllProvidersFailed {
                primary, attempted, ..
            } => {
                assert_eq!(primary, ProviderId::OpenAI);
                assert_eq!(
                    attempted,
                    vec![ProviderId::OpenAI, ProviderId::Groq, ProviderId::Azure]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gateway.primary(), ProviderId::OpenAI);
    }

    #[tokio::test]
    async fn unregistered_fallback_is_skipped() {
        let gateway = LlmGateway::new(Arc::new(failing(ProviderId::OpenAI)), fast_policy());

        let err = gateway
            .complete_with_fallback("p", "s", &[ProviderId::Azure])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::AllProvidersFailed { ref attempted, .. } if attempted == &vec![ProviderId::OpenAI]
        ));
    }

    #[tokio::test]
    async fn empty_fallback_list_returns_primary_error() {
        let gateway = LlmGateway::new(Arc::new(failing(ProviderId::OpenAI)), fast_policy());

        let err = gateway.complete_with_fallback("p", "s", &[]).await.unwrap_err();

        assert!(matches!(err, GatewayError::AllAttemptsFailed { .. }));
    }

    #[tokio::test]
    async fn auth_failure_retries_primary_then_falls_back() {
        let primary = MockAIProvider::new().with_persistent_error(MockError::AuthenticationFailed);
        let backup = MockAIProvider::new()
            .with_provider(ProviderId::Groq, "llama")
            .with_response("ok");
        let gateway = LlmGateway::new(Arc::new(primary.clone()), fast_policy())
            .with_fallback_provider(Arc::new(backup));

        let completion = gateway
            .complete_with_fallback("p", "s", &[ProviderId::Groq])
            .await
            .unwrap();

        assert_eq!(completion.content, "ok");
        assert_eq!(primary.call_count(), 3);
    }

    #[tokio::test]
    async fn primary_and_repeated_fallback_ids_run_once() {
        let primary = failing(ProviderId::Groq);
        let backup = failing(ProviderId::OpenAI);
        let gateway = LlmGateway::new(Arc::new(primary.clone()), fast_policy())
            .with_fallback_provider(Arc::new(backup.clone()));

        let err = gateway
            .complete_with_fallback(
                "p",
                "s",
                &[ProviderId::Groq, ProviderId::OpenAI, ProviderId::OpenAI],
            )
            .await
            .unwrap_err();

        assert_eq!(primary.call_count(), 3);
        assert_eq!(backup.call_count(), 3);
        match err {
            GatewayError::AllProvidersFailed { attempted, .. } => {
                assert_eq!(attempted, vec![ProviderId::Groq, ProviderId::OpenAI]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fallback_list_of_only_the_primary_returns_primary_error() {
        let primary = failing(ProviderId::Groq);
        let gateway = LlmGateway::new(Arc::new(primary.clone()), fast_policy());

        let err = gateway
            .complete_with_fallback("p", "s", &[ProviderId::Groq])
            .await
            .unwrap_err();

        assert_eq!(primary.call_count(), 3);
        assert!(matches!(err, GatewayError::AllAttemptsFailed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_lose_usage_updates() {
        let gateway = Arc::new(LlmGateway::new(Arc::new(MockAIProvider::new()), fast_policy()));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let gateway = Arc::clone(&gateway);
                tokio::spawn(async move { gateway.complete("p", "s", None, None).await })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        // Default mock response uses 15 tokens.
        assert_eq!(gateway.usage().total_tokens_used, 50 * 15);
    }

    #[tokio::test]
    async fn usage_stats_round_cost_and_name_primary() {
        let mock = MockAIProvider::new()
            .with_provider(ProviderId::OpenAI, "gpt-4")
            .with_response_full("x", TokenUsage::new(1, 2), FinishReason::Stop);
        let gateway = LlmGateway::new(Arc::new(mock), fast_policy());

        gateway.complete("p", "s", None, None).await.unwrap();
        let stats = gateway.usage_stats();

        // 3 tokens at 0.03 per 1K is 0.00009, rounded to 0.0001.
        assert_eq!(stats.total_cost, 0.0001);
        assert_eq!(stats.total_tokens_used, 3);
        assert_eq!(stats.provider, ProviderId::OpenAI);
        assert_eq!(stats.model, "gpt-4");
    }

    #[test]
    fn fallback_with_primary_id_is_ignored() {
        let gateway = LlmGateway::new(Arc::new(MockAIProvider::new()), fast_policy())
            .with_fallback_provider(Arc::new(failing(ProviderId::OpenAI)))
            .with_fallback_provider(Arc::new(failing(ProviderId::Groq)));

        assert_eq!(gateway.providers(), vec![ProviderId::Groq, ProviderId::OpenAI]);
    }

    #[test]
    fn from_config_requires_primary_credentials() {
        let config = AiConfig::default();

        let result = LlmGateway::from_config(&config);

        assert!(matches!(
            result,
            Err(GatewayBuildError::Config(ValidationError::MissingCredentials(ProviderId::Groq)))
        ));
    }

    #[test]
    fn from_config_registers_credentialed_fallbacks_only() {
        let config = AiConfig {
            groq_api_key: Some(Secret::new("gsk-test".to_string())),
            openai_api_key: Some(Secret::new("sk-test".to_string())),
            fallback_providers: vec![ProviderId::OpenAI, ProviderId::Azure],
            ..Default::default()
        };

        let gateway = LlmGateway::from_config(&config).unwrap();

        assert_eq!(gateway.primary(), ProviderId::Groq);
        assert_eq!(gateway.providers(), vec![ProviderId::Groq, ProviderId::OpenAI]);
    }
}
