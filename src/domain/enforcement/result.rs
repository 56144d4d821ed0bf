//! Aggregated outcome of one enforcement pass.

use serde::{Deserialize, Serialize};

use super::Violation;
use crate::domain::schema::Enforcement;

/// Violations found for one section and the pass/fail verdict derived from them.
///
/// `passed`, `warnings` and `advisories` are projections of `violations`:
/// they are recomputed on every insertion and on deserialization, so they
/// can never disagree with the violation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EnforcementRecord")]
pub struct EnforcementResult {
    violations: Vec<Violation>,
    passed: bool,
    warnings: Vec<String>,
    advisories: Vec<String>,
}

impl EnforcementResult {
    /// An empty, passing result.
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            passed: true,
            warnings: Vec::new(),
            advisories: Vec::new(),
        }
    }

    pub fn from_violations(violations: impl IntoIterator<Item = Violation>) -> Self {
        let mut result = Self::new();
        for violation in violations {
            result.add_violation(violation);
        }
        result
    }

    pub fn add_violation(&mut self, violation: Violation) {
        match violation.severity {
            Enforcement::Strict => self.passed = false,
            Enforcement::Warning => self.warnings.push(violation.message.clone()),
            Enforcement::Advisory => self.advisories.push(violation.message.clone()),
        }
        self.violations.push(violation);
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn advisories(&self) -> &[String] {
        &self.advisories
    }

    pub fn strict_violation_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_blocking()).count()
    }
}

impl Default for EnforcementResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire shape accepted on deserialization; derived fields are ignored.
#[derive(Deserialize)]
struct EnforcementRecord {
    #[serde(default)]
    violations: Vec<Violation>,
}

impl From<EnforcementRecord> for EnforcementResult {
    fn from(record: EnforcementRecord) -> Self {
        Self::from_violations(record.violations)
    }
}
