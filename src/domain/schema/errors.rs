//! Schema validation errors.

use thiserror::Error;

use super::RuleParameterError;

/// A single structural problem found in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("schema id cannot be empty")]
    EmptyId,

    #[error("duplicate section name '{0}'")]
    DuplicateSectionName(String),

    #[error("duplicate section order {0}")]
    DuplicateSectionOrder(i32),

    #[error("duplicate rule id '{0}'")]
    DuplicateRuleId(String),

    #[error(transparent)]
    RuleParameters(#[from] RuleParameterError),

    #[error("pattern rule {rule_id} has invalid regex: {reason}")]
    InvalidPattern { rule_id: String, reason: String },

    #[error("section '{section}' min_length {min} exceeds max_length {max}")]
    InvertedLengthBounds {
        section: String,
        min: usize,
        max: usize,
    },
}

/// Every violation found while validating one schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid schema: {}", join_violations(.0))]
pub struct SchemaValidationErrors(pub Vec<SchemaViolation>);

impl SchemaValidationErrors {
    pub fn violations(&self) -> &[SchemaViolation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
