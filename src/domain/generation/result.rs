//! Generation output records.

use serde::{Deserialize, Serialize};

use crate::domain::enforcement::EnforcementResult;

/// One generated, enforced and transformed proposal section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub section_name: String,
    pub content: String,
    pub order: i32,
    pub rule_enforcement: EnforcementResult,
    /// What the model reported about its own answer. Not part of the report.
    #[serde(skip)]
    pub insight: SectionInsight,
}

/// Self-assessment carried in the model's reply envelope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionInsight {
    /// Within `[0, 1]`.
    pub confidence: f64,
    pub rationale: String,
    pub sources: Vec<String>,
    pub missing_info: Vec<String>,
}

impl GeneratedSection {
    pub fn passed(&self) -> bool {
        self.rule_enforcement.passed()
    }
}

/// A complete proposal draft with aggregate accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub sections: Vec<GeneratedSection>,
    pub total_rules_enforced: usize,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// True only if every section passed its strict rules.
    pub all_rules_passed: bool,
}

impl GenerationResult {
    /// An empty result; `all_rules_passed` starts true.
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            total_rules_enforced: 0,
            total_tokens: 0,
            total_cost: 0.0,
            all_rules_passed: true,
        }
    }

    /// Appends a section and folds its usage into the totals.
    pub fn record(&mut self, section: GeneratedSection, rules_enforced: usize, tokens: u64, cost: f64) {
        self.all_rules_passed &= section.passed();
        self.total_rules_enforced += rules_enforced;
        self.total_tokens += tokens;
        self.total_cost += cost;
        self.sections.push(section);
    }
}

impl Default for GenerationResult {
    fn default() -> Self {
        Self::new()
    }
}
