//! Rule violations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::schema::{Enforcement, Rule};

/// Record of one failed check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Enforcement,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl Violation {
    /// Creates a violation at the rule's own enforcement level.
    ///
    /// The rule's `error_message` wins over `default_message` when set.
    pub fn for_rule(rule: &Rule, default_message: impl Into<String>) -> Self {
        Self {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            severity: rule.enforcement,
            message: rule
                .error_message
                .clone()
                .unwrap_or_else(|| default_message.into()),
            details: BTreeMap::new(),
        }
    }

    /// A rule whose evaluation itself failed. Always a warning.
    pub fn evaluation_failure(rule: &Rule, error: impl std::fmt::Display) -> Self {
        Self {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            severity: Enforcement::Warning,
            message: format!("Rule enforcement error: {}", error),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}
