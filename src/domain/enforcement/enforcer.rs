//! Rule enforcer.
//!
//! Evaluates generated section content against the section's rules. Each rule
//! is checked independently; a rule that cannot be evaluated becomes a
//! warning violation instead of aborting the pass.

use regex::RegexBuilder;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use super::patterns::{count_list_items, CURRENCY_AMOUNT, PHASE_OR_DURATION};
use super::{EnforcementResult, Violation};
use crate::domain::schema::{FormatShape, Rule, RuleKind, RuleParameterError, RuleType};

/// A single rule could not be evaluated.
#[derive(Debug, Error)]
pub enum RuleEvaluationError {
    #[error(transparent)]
    Parameters(#[from] RuleParameterError),

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Stateless rule evaluator, shared freely between requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEnforcer;

impl RuleEnforcer {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates every non-transformation rule against `content`.
    pub fn enforce(
        &self,
        content: &str,
        rules: &[Rule],
        section_name: &str,
        survey_notes: &str,
    ) -> EnforcementResult {
        debug!(
            section = section_name,
            content_length = content.chars().count(),
            survey_notes_length = survey_notes.len(),
            rules = rules.len(),
            "Enforcing rules"
        );

        let mut result = EnforcementResult::new();
        for rule in rules.iter().filter(|r| r.rule_type != RuleType::Transformation) {
            match self.evaluate(content, rule) {
                Ok(violations) => {
                    for violation in violations {
                        debug!(
                            section = section_name,
                            rule_id = %violation.rule_id,
                            severity = %violation.severity,
                            "Rule violated"
                        );
                        result.add_violation(violation);
                    }
                }
                Err(e) => result.add_violation(Violation::evaluation_failure(rule, e)),
            }
        }

        info!(
            section = section_name,
            passed = result.passed(),
            violations = result.violations().len(),
            warnings = result.warnings().len(),
            "Rule enforcement completed"
        );
        result
    }

    /// Applies transformation rules; see [`super::apply_transformations`].
    pub fn apply_transformations(&self, content: &str, rules: &[Rule]) -> String {
        super::apply_transformations(content, rules)
    }

    fn evaluate(&self, content: &str, rule: &Rule) -> Result<Vec<Violation>, RuleEvaluationError> {
        let violations = match rule.kind()? {
            RuleKind::Length { min, max } => check_length(content, rule, min, max),
            RuleKind::Pattern { pattern } => check_pattern(content, rule, pattern)?,
            RuleKind::RequiredField { field, fields } => {
                check_required_fields(content, rule, field, fields)
            }
            RuleKind::Validation {
                check_for,
                min_items,
            } => check_validation(content, rule, &check_for, min_items),
            RuleKind::Format(shape) => check_format(content, rule, shape),
            RuleKind::Constraint => Vec::new(),
            RuleKind::Transformation(_) => Vec::new(),
        };
        Ok(violations)
    }
}

fn check_length(content: &str, rule: &Rule, min: Option<usize>, max: Option<usize>) -> Vec<Violation> {
    let length = content.chars().count();
    match (min, max) {
        (Some(min), _) if length < min => vec![Violation::for_rule(
            rule,
            format!("Content too short: {} < {}", length, min),
        )
        .with_detail("actual_length", length)
        .with_detail("min_length", min)],
        (_, Some(max)) if length > max => vec![Violation::for_rule(
            rule,
            format!("Content too long: {} > {}", length, max),
        )
        .with_detail("actual_length", length)
        .with_detail("max_length", max)],
        _ => Vec::new(),
    }
}

fn check_pattern(content: &str, rule: &Rule, pattern: String) -> Result<Vec<Violation>, RuleEvaluationError> {
    let regex = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleEvaluationError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;

    if regex.is_match(content) {
        return Ok(Vec::new());
    }
    Ok(vec![Violation::for_rule(rule, "Content does not match required pattern")
        .with_detail("pattern", pattern)])
}

fn contains_ignore_case(haystack_lower: &str, needle: &str) -> bool {
    haystack_lower.contains(&needle.to_lowercase())
}

fn check_required_fields(
    content: &str,
    rule: &Rule,
    field: Option<String>,
    fields: Vec<String>,
) -> Vec<Violation> {
    let lower = content.to_lowercase();
    let mut violations = Vec::new();

    if let Some(field) = field {
        if !contains_ignore_case(&lower, &field) {
            violations.push(
                Violation::for_rule(rule, format!("Required field '{}' not found", field))
                    .with_detail("missing_field", field),
            );
        }
    }

    let missing: Vec<String> = fields
        .into_iter()
        .filter(|f| !contains_ignore_case(&lower, f))
        .collect();
    if !missing.is_empty() {
        violations.push(
            Violation::for_rule(rule, format!("Required fields missing: {}", missing.join(", ")))
                .with_detail("missing_fields", missing),
        );
    }

    violations
}

fn check_validation(
    content: &str,
    rule: &Rule,
    check_for: &[String],
    min_items: Option<usize>,
) -> Vec<Violation> {
    let lower = content.to_lowercase();
    let mut violations = Vec::new();

    let found: Vec<&String> = check_for
        .iter()
        .filter(|placeholder| contains_ignore_case(&lower, placeholder))
        .collect();
    if !found.is_empty() {
        let listed: Vec<&str> = found.iter().map(|s| s.as_str()).collect();
        violations.push(
            Violation::for_rule(rule, format!("Placeholder text found: {}", listed.join(", ")))
                .with_detail("placeholders_found", json!(listed)),
        );
    }

    if let Some(min_items) = min_items {
        let items = count_list_items(content);
        if items < min_items {
            violations.push(
                Violation::for_rule(rule, format!("Insufficient items: {} < {}", items, min_items))
                    .with_detail("actual_items", items)
                    .with_detail("min_items", min_items),
            );
        }
    }

    violations
}

fn check_format(content: &str, rule: &Rule, shape: FormatShape) -> Vec<Violation> {
    let (satisfied, message) = match shape {
        FormatShape::List => (
            count_list_items(content) > 0,
            "Content must be formatted as a list",
        ),
        FormatShape::Itemized => (
            CURRENCY_AMOUNT.is_match(content),
            "Content must include itemized costs",
        ),
        FormatShape::PhasesWithDuration => (
            PHASE_OR_DURATION.is_match(content),
            "Content must include phases with durations",
        ),
    };

    if satisfied {
        Vec::new()
    } else {
        vec![Violation::for_rule(rule, message).with_detail("required_format", shape.as_str())]
    }
}
