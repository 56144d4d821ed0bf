//! Proposal schema aggregate.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::{Rule, RuleKind, SchemaValidationErrors, SchemaViolation, Section};

/// A named, versioned proposal schema: ordered sections plus global rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub sections: Vec<Section>,
    /// Rules applied to every section, ahead of the section's own rules.
    #[serde(default)]
    pub global_rules: Vec<Rule>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
            sections: Vec::new(),
            global_rules: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_global_rule(mut self, rule: Rule) -> Self {
        self.global_rules.push(rule);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Finds a section by machine name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Sections sorted by `order`, ascending.
    pub fn sections_in_order(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.iter().collect();
        sections.sort_by_key(|s| s.order);
        sections
    }

    /// Global rules followed by the section's rules, or `None` for an
    /// unknown section.
    pub fn rules_for(&self, section_name: &str) -> Option<Vec<Rule>> {
        let section = self.section(section_name)?;
        Some(
            self.global_rules
                .iter()
                .chain(section.rules.iter())
                .cloned()
                .collect(),
        )
    }

    /// Every rule in the schema, global rules first.
    pub fn all_rules(&self) -> impl Iterator<Item = &Rule> {
        self.global_rules
            .iter()
            .chain(self.sections.iter().flat_map(|s| s.rules.iter()))
    }

    /// Checks the structural invariants and collects every violation.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationErrors` listing all problems found, in the
    /// order: identity, sections, rule ids, rule parameters.
    pub fn validate(&self) -> Result<(), SchemaValidationErrors> {
        let mut violations = Vec::new();

        if self.id.trim().is_empty() {
            violations.push(SchemaViolation::EmptyId);
        }

        let mut names = HashSet::new();
        let mut reported_names = HashSet::new();
        let mut orders = HashSet::new();
        let mut reported_orders = HashSet::new();
        for section in &self.sections {
            if !names.insert(section.name.as_str()) && reported_names.insert(section.name.as_str()) {
                violations.push(SchemaViolation::DuplicateSectionName(section.name.clone()));
            }
            if !orders.insert(section.order) && reported_orders.insert(section.order) {
                violations.push(SchemaViolation::DuplicateSectionOrder(section.order));
            }
            if let (Some(min), Some(max)) = (section.min_length, section.max_length) {
                if min > max {
                    violations.push(SchemaViolation::InvertedLengthBounds {
                        section: section.name.clone(),
                        min,
                        max,
                    });
                }
            }
        }

        let mut rule_ids = HashSet::new();
        let mut reported_rule_ids = HashSet::new();
        for rule in self.all_rules() {
            if !rule_ids.insert(rule.id.as_str()) && reported_rule_ids.insert(rule.id.as_str()) {
                violations.push(SchemaViolation::DuplicateRuleId(rule.id.clone()));
            }
        }

        for rule in self.all_rules() {
            match rule.kind() {
                Ok(RuleKind::Pattern { pattern }) => {
                    if let Err(e) = Regex::new(&pattern) {
                        violations.push(SchemaViolation::InvalidPattern {
                            rule_id: rule.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
                Ok(_) => {}
                Err(e) => violations.push(e.into()),
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationErrors(violations))
        }
    }
}
