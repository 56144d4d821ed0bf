//! GenerateProposalHandler - Drive one proposal generation end to end.
//!
//! Sections are generated strictly in `order`. For each one the handler
//! builds the prompt pair, calls the gateway (with fallback), unwraps the
//! reply envelope, enforces the section's rules and applies transformation
//! rules. Any gateway failure aborts the whole request: there are no partial
//! proposals. Rule violations do not abort; they are reported in the result.

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::ai::{GatewayError, LlmGateway};
use crate::domain::enforcement::RuleEnforcer;
use crate::domain::generation::{GeneratedSection, GenerationResult, SectionInsight};
use crate::domain::prompt::{PromptBuilder, PromptError, ResponseEnvelope};
use crate::domain::schema::{Schema, Section};
use crate::ports::{ProviderId, SchemaRegistry};

/// Command to generate a proposal against a registered schema
#[derive(Debug, Clone)]
pub struct GenerateProposalCommand {
    pub survey_notes: String,
    pub schema_id: String,
    pub guidance: Option<String>,
}

/// Error type for proposal generation
#[derive(Debug, Error)]
pub enum GenerateProposalError {
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    #[error("no active schema is set")]
    NoActiveSchema,

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("required section '{section}' came back empty")]
    EmptyContent { section: String },

    #[error("LLM generation failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("generation cancelled")]
    Cancelled,
}

/// Handler for proposal generation
pub struct GenerateProposalHandler {
    registry: Arc<dyn SchemaRegistry>,
    gateway: Arc<LlmGateway>,
    enforcer: RuleEnforcer,
    prompts: PromptBuilder,
    fallback_providers: Vec<ProviderId>,
}

impl GenerateProposalHandler {
    pub fn new(registry: Arc<dyn SchemaRegistry>, gateway: Arc<LlmGateway>) -> Self {
        Self {
            registry,
            gateway,
            enforcer: RuleEnforcer::new(),
            prompts: PromptBuilder::new(),
            fallback_providers: Vec::new(),
        }
    }

    /// Providers tried, in order, after the primary is exhausted.
    pub fn with_fallback_providers(mut self, providers: Vec<ProviderId>) -> Self {
        self.fallback_providers = providers;
        self
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Generates every section of the named schema.
    ///
    /// # Errors
    ///
    /// - `SchemaNotFound` if no schema has `cmd.schema_id`
    /// - `Prompt` if the survey notes are blank
    /// - `Gateway` if every provider is exhausted for some section
    /// - `EmptyContent` if a required section is blank
    /// - `Cancelled` if `cancel` fires before the last section completes
    pub async fn handle(
        &self,
        cmd: GenerateProposalCommand,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerateProposalError> {
        let schema = self
            .registry
            .get(&cmd.schema_id)
            .await
            .ok_or_else(|| GenerateProposalError::SchemaNotFound(cmd.schema_id.clone()))?;

        self.generate(&schema, &cmd.survey_notes, cmd.guidance.as_deref(), cancel)
            .await
    }

    /// Generates against whichever schema is active.
    ///
    /// # Errors
    ///
    /// - `NoActiveSchema` if none has been activated
    /// - otherwise as [`Self::handle`]
    pub async fn handle_active(
        &self,
        survey_notes: &str,
        guidance: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerateProposalError> {
        let schema = self
            .registry
            .get_active()
            .await
            .ok_or(GenerateProposalError::NoActiveSchema)?;

        self.generate(&schema, survey_notes, guidance, cancel).await
    }

    async fn generate(
        &self,
        schema: &Schema,
        survey_notes: &str,
        guidance: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerateProposalError> {
        info!(
            schema_id = %schema.id,
            version = %schema.version,
            sections = schema.sections.len(),
            "Starting proposal generation"
        );

        let mut result = GenerationResult::new();
        for section in schema.sections_in_order() {
            if cancel.is_cancelled() {
                warn!(section = %section.name, "Generation cancelled");
                return Err(GenerateProposalError::Cancelled);
            }

            let generated = self
                .generate_section(schema, section, survey_notes, guidance, cancel)
                .await?;
            result.record(
                generated.section,
                generated.rules_enforced,
                generated.tokens,
                generated.cost,
            );
        }

        info!(
            schema_id = %schema.id,
            sections = result.sections.len(),
            all_rules_passed = result.all_rules_passed,
            total_rules_enforced = result.total_rules_enforced,
            total_tokens = result.total_tokens,
            total_cost = result.total_cost,
            "Proposal generation completed"
        );
        Ok(result)
    }

    async fn generate_section(
        &self,
        schema: &Schema,
        section: &Section,
        survey_notes: &str,
        guidance: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SectionOutcome, GenerateProposalError> {
        let prompt = self
            .prompts
            .build(survey_notes, section, &schema.global_rules, guidance)?;

        let completion = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerateProposalError::Cancelled),
            completion = self.gateway.complete_with_fallback(
                &prompt.user_prompt,
                &prompt.system_instruction,
                &self.fallback_providers,
            ) => completion?,
        };

        let envelope = ResponseEnvelope::parse(&completion.content);
        debug!(
            section = %section.name,
            confidence = envelope.confidence,
            missing_info = envelope.missing_info.len(),
            "Reply envelope parsed"
        );
        if !envelope.missing_info.is_empty() {
            warn!(
                section = %section.name,
                missing = %envelope.missing_info.join("; "),
                "Model reported information missing from the survey notes"
            );
        }
        if section.required && envelope.content.trim().is_empty() {
            return Err(GenerateProposalError::EmptyContent {
                section: section.name.clone(),
            });
        }

        let rules = schema.rules_for(&section.name).unwrap_or_default();
        let enforcement = self
            .enforcer
            .enforce(&envelope.content, &rules, &section.name, survey_notes);
        let content = self.enforcer.apply_transformations(&envelope.content, &rules);
        let ResponseEnvelope {
            confidence,
            rationale,
            sources,
            missing_info,
            ..
        } = envelope;

        info!(
            section = %section.name,
            provider = %completion.provider_id,
            passed = enforcement.passed(),
            tokens = completion.tokens_used,
            "Section generated"
        );

        Ok(SectionOutcome {
            section: GeneratedSection {
                section_name: section.name.clone(),
                content,
                order: section.order,
                rule_enforcement: enforcement,
                insight: SectionInsight {
                    confidence,
                    rationale,
                    sources,
                    missing_info,
                },
            },
            rules_enforced: rules.len(),
            tokens: completion.tokens_used,
            cost: completion.estimated_cost,
        })
    }
}

struct SectionOutcome {
    section: GeneratedSection,
    rules_enforced: usize,
    tokens: u64,
    cost: f64,
}
