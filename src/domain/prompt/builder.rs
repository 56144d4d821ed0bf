//! Prompt construction for one proposal section.
//!
//! The system instruction frames the section and lists every rule the output
//! will be checked against; the user prompt carries the survey notes and the
//! section's shaping hints (guidance, template, format, length bounds).

use std::fmt::Write as _;
use thiserror::Error;
use tracing::debug;

use super::compress_prompt;
use crate::domain::schema::{Rule, Section};

/// JSON reply shape requested from the model.
const OUTPUT_CONTRACT: &str = r#"Respond with valid JSON only:
{
  "content": "The generated section content",
  "confidence": 0.85,
  "rationale": "How the survey notes support this content",
  "sources": ["Quotes or references from the survey notes"],
  "missing_info": ["Critical information not found in the survey notes"]
}"#;

/// Errors raised while building a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("survey notes cannot be empty")]
    EmptyInput,
}

/// System instruction and user prompt for one LLM call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system_instruction: String,
    pub user_prompt: String,
}

/// Builds section prompts from survey notes.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    compress: bool,
}

impl PromptBuilder {
    /// Creates a builder that compresses user prompts.
    pub fn new() -> Self {
        Self { compress: true }
    }

    /// Enables or disables user prompt compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Builds the prompt pair for `section`.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::EmptyInput` if `survey_notes` is blank.
    pub fn build(
        &self,
        survey_notes: &str,
        section: &Section,
        global_rules: &[Rule],
        guidance: Option<&str>,
    ) -> Result<PromptPair, PromptError> {
        if survey_notes.trim().is_empty() {
            return Err(PromptError::EmptyInput);
        }

        let system_instruction = self.system_instruction(section, global_rules);
        let raw_prompt = self.user_prompt(survey_notes, section, guidance);
        let user_prompt = if self.compress {
            let compressed = compress_prompt(&raw_prompt);
            debug!(
                section = %section.name,
                original_length = raw_prompt.len(),
                compressed_length = compressed.len(),
                "Prompt compressed"
            );
            compressed
        } else {
            raw_prompt
        };

        Ok(PromptPair {
            system_instruction,
            user_prompt,
        })
    }

    fn system_instruction(&self, section: &Section, global_rules: &[Rule]) -> String {
        let mut message = format!(
            "You are generating the {} section of a business proposal.\n\n\
             Section Description: {}\n\n\
             CRITICAL: Your output will be ENFORCED against strict rules. You MUST:\n\
             1. Base content ONLY on the actual survey notes provided\n\
             2. Follow the required output format: {}\n\
             3. Comply with all section rules\n\n\
             {}\n",
            section.display_name, section.description, section.output_format, OUTPUT_CONTRACT
        );

        write_rules(&mut message, "SECTION RULES (STRICTLY ENFORCED):", &section.rules);
        write_rules(&mut message, "GLOBAL RULES (STRICTLY ENFORCED):", global_rules);
        message
    }

    fn user_prompt(&self, survey_notes: &str, section: &Section, guidance: Option<&str>) -> String {
        let mut prompt = format!(
            "Generate the {} section based on these survey notes:\n\nSURVEY NOTES:\n{}\n",
            section.display_name, survey_notes
        );

        if let Some(guidance) = guidance.filter(|g| !g.trim().is_empty()) {
            let _ = write!(prompt, "\nADDITIONAL GUIDANCE:\n{}\n", guidance);
        }
        if let Some(template) = section.template.as_deref().filter(|t| !t.trim().is_empty()) {
            let _ = write!(prompt, "\nTEMPLATE:\n{}\n", template);
        }

        let _ = write!(prompt, "\nOutput Format: {}\n", section.output_format);
        if let Some(min) = section.min_length {
            let _ = writeln!(prompt, "Minimum Length: {} characters", min);
        }
        if let Some(max) = section.max_length {
            let _ = writeln!(prompt, "Maximum Length: {} characters", max);
        }
        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_rules(message: &mut String, heading: &str, rules: &[Rule]) {
    if rules.is_empty() {
        return;
    }
    let _ = write!(message, "\n{}\n", heading);
    for rule in rules {
        let _ = writeln!(message, "- {}: {}", rule.name, rule.description);
    }
}
