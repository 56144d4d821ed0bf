//! Rule definitions and their typed interpretation.
//!
//! A [`Rule`] is the record an administrator writes: a `type` tag plus a loose
//! `parameters` map. The enforcer never reads that map directly; it asks the
//! rule for its [`RuleKind`], a closed sum type where every variant carries
//! only the parameters that rule type understands.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Free-form rule parameters, keyed by name.
pub type Parameters = BTreeMap<String, Value>;

/// Rule type tag as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Character length bounds.
    Length,
    /// Regular-expression search.
    Pattern,
    /// Required keywords.
    RequiredField,
    /// Placeholder detection and minimum item counts.
    Validation,
    /// Named content shapes.
    Format,
    /// Reserved for custom business constraints.
    Constraint,
    /// Post-processing rewrite of the content.
    Transformation,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::Length => write!(f, "length"),
            RuleType::Pattern => write!(f, "pattern"),
            RuleType::RequiredField => write!(f, "required_field"),
            RuleType::Validation => write!(f, "validation"),
            RuleType::Format => write!(f, "format"),
            RuleType::Constraint => write!(f, "constraint"),
            RuleType::Transformation => write!(f, "transformation"),
        }
    }
}

/// How a failed rule affects the pass/fail outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// Blocks the section from passing.
    #[default]
    Strict,
    /// Recorded, does not block.
    Warning,
    /// Informational only.
    Advisory,
}

impl Enforcement {
    /// Returns true if a violation at this level fails the section.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Enforcement::Strict)
    }
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Enforcement::Strict => write!(f, "strict"),
            Enforcement::Warning => write!(f, "warning"),
            Enforcement::Advisory => write!(f, "advisory"),
        }
    }
}

/// An administrator-defined rule attached to a schema or section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enforcement: Enforcement,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Rule {
    /// Creates a strict rule with no parameters.
    pub fn new(id: impl Into<String>, name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rule_type,
            description: String::new(),
            enforcement: Enforcement::Strict,
            parameters: Parameters::new(),
            error_message: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_enforcement(mut self, enforcement: Enforcement) -> Self {
        self.enforcement = enforcement;
        self
    }

    /// Sets one parameter, replacing any previous value under the same key.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Interprets the parameter map according to the rule type.
    ///
    /// # Errors
    ///
    /// Returns `RuleParameterError` when a parameter the type requires is
    /// absent, has the wrong JSON type, or names an unknown variant.
    pub fn kind(&self) -> Result<RuleKind, RuleParameterError> {
        match self.rule_type {
            RuleType::Length => {
                let min = self.optional_count("min")?;
                let max = self.optional_count("max")?;
                if min.is_none() && max.is_none() {
                    return Err(self.missing("min/max"));
                }
                Ok(RuleKind::Length { min, max })
            }
            RuleType::Pattern => match self.optional_str("pattern")? {
                Some(pattern) if !pattern.is_empty() => Ok(RuleKind::Pattern { pattern }),
                _ => Err(self.missing("pattern")),
            },
            RuleType::RequiredField => {
                let field = self.optional_str("field")?.filter(|f| !f.is_empty());
                let fields = self.string_list("fields")?;
                if field.is_none() && fields.is_empty() {
                    return Err(self.missing("field"));
                }
                Ok(RuleKind::RequiredField { field, fields })
            }
            RuleType::Validation => Ok(RuleKind::Validation {
                check_for: self.string_list("check_for")?,
                min_items: self.optional_count("min_items")?,
            }),
            RuleType::Format => {
                let name = self
                    .optional_str("format")?
                    .ok_or_else(|| self.missing("format"))?;
                FormatShape::from_name(&name)
                    .map(RuleKind::Format)
                    .ok_or_else(|| self.unknown("format", name))
            }
            RuleType::Constraint => Ok(RuleKind::Constraint),
            RuleType::Transformation => {
                let name = self
                    .optional_str("type")?
                    .ok_or_else(|| self.missing("type"))?;
                let transformation = match name.as_str() {
                    "add_prefix" => {
                        Transformation::AddPrefix(self.optional_str("prefix")?.unwrap_or_default())
                    }
                    "add_suffix" => {
                        Transformation::AddSuffix(self.optional_str("suffix")?.unwrap_or_default())
                    }
                    "replace" => {
                        let find = self
                            .optional_str("find")?
                            .filter(|f| !f.is_empty())
                            .ok_or_else(|| self.missing("find"))?;
                        Transformation::Replace {
                            find,
                            replace: self.optional_str("replace")?.unwrap_or_default(),
                        }
                    }
                    _ => return Err(self.unknown("type", name)),
                };
                Ok(RuleKind::Transformation(transformation))
            }
        }
    }

    fn optional_count(&self, key: &str) -> Result<Option<usize>, RuleParameterError> {
        match self.parameters.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| self.invalid(key, "a non-negative integer")),
        }
    }

    fn optional_str(&self, key: &str) -> Result<Option<String>, RuleParameterError> {
        match self.parameters.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(key, "a string")),
        }
    }

    fn string_list(&self, key: &str) -> Result<Vec<String>, RuleParameterError> {
        match self.parameters.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(key, "a list of strings"))
                })
                .collect(),
            Some(_) => Err(self.invalid(key, "a list of strings")),
        }
    }

    fn missing(&self, expected: &'static str) -> RuleParameterError {
        RuleParameterError::Missing {
            rule_id: self.id.clone(),
            rule_type: self.rule_type,
            expected,
        }
    }

    fn invalid(&self, parameter: &str, expected: &'static str) -> RuleParameterError {
        RuleParameterError::InvalidType {
            rule_id: self.id.clone(),
            parameter: parameter.to_string(),
            expected,
        }
    }

    fn unknown(&self, parameter: &'static str, value: String) -> RuleParameterError {
        RuleParameterError::UnknownVariant {
            rule_id: self.id.clone(),
            parameter,
            value,
        }
    }
}

/// Typed interpretation of a rule, one variant per rule type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    Pattern {
        pattern: String,
    },
    /// `field` and `fields` are checked independently.
    RequiredField {
        field: Option<String>,
        fields: Vec<String>,
    },
    Validation {
        check_for: Vec<String>,
        min_items: Option<usize>,
    },
    Format(FormatShape),
    Constraint,
    Transformation(Transformation),
}

/// Named content shapes a `format` rule can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatShape {
    /// At least one bullet or numbered line.
    List,
    /// Contains a currency amount.
    Itemized,
    /// Mentions a phase or a duration unit.
    PhasesWithDuration,
}

impl FormatShape {
    /// Looks a shape up by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "list" => Some(FormatShape::List),
            "itemized" => Some(FormatShape::Itemized),
            "phases_with_duration" => Some(FormatShape::PhasesWithDuration),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatShape::List => "list",
            FormatShape::Itemized => "itemized",
            FormatShape::PhasesWithDuration => "phases_with_duration",
        }
    }
}

/// A deterministic rewrite applied after enforcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    AddPrefix(String),
    AddSuffix(String),
    Replace { find: String, replace: String },
}

/// A rule's parameters do not fit its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParameterError {
    #[error("{rule_type} rule {rule_id} missing {expected} parameter")]
    Missing {
        rule_id: String,
        rule_type: RuleType,
        expected: &'static str,
    },

    #[error("rule {rule_id} parameter '{parameter}' must be {expected}")]
    InvalidType {
        rule_id: String,
        parameter: String,
        expected: &'static str,
    },

    #[error("rule {rule_id} has unknown {parameter} '{value}'")]
    UnknownVariant {
        rule_id: String,
        parameter: &'static str,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn length_rule_with_bounds_parses() {
        let rule = Rule::new("len", "Length", RuleType::Length)
            .with_parameter("min", 200)
            .with_parameter("max", 1000);

        assert_eq!(
            rule.kind().unwrap(),
            RuleKind::Length {
                min: Some(200),
                max: Some(1000)
            }
        );
    }

    #[test]
    fn length_rule_without_bounds_is_missing_min_max() {
        let rule = Rule::new("len", "Length", RuleType::Length);

        let err = rule.kind().unwrap_err();
        assert_eq!(err.to_string(), "length rule len missing min/max parameter");
    }

    #[test]
    fn length_rule_rejects_non_integer_bound() {
        let rule = Rule::new("len", "Length", RuleType::Length).with_parameter("min", "ten");

        assert!(matches!(
            rule.kind(),
            Err(RuleParameterError::InvalidType { .. })
        ));
    }

    #[test]
    fn pattern_rule_requires_pattern() {
        let rule = Rule::new("p", "Pattern", RuleType::Pattern);
        assert!(matches!(rule.kind(), Err(RuleParameterError::Missing { .. })));

        let rule = rule.with_parameter("pattern", r"\bscope\b");
        assert_eq!(
            rule.kind().unwrap(),
            RuleKind::Pattern {
                pattern: r"\bscope\b".to_string()
            }
        );
    }

    #[test]
    fn required_field_accepts_field_or_fields() {
        let single = Rule::new("r1", "Req", RuleType::RequiredField).with_parameter("field", "disclaimer");
        let multi = Rule::new("r2", "Req", RuleType::RequiredField)
            .with_parameter("fields", json!(["scope", "objectives"]));
        let neither = Rule::new("r3", "Req", RuleType::RequiredField);

        assert!(single.kind().is_ok());
        assert_eq!(
            multi.kind().unwrap(),
            RuleKind::RequiredField {
                field: None,
                fields: vec!["scope".to_string(), "objectives".to_string()]
            }
        );
        assert!(neither.kind().is_err());
    }

    #[test]
    fn validation_rule_without_parameters_is_valid() {
        let rule = Rule::new("tone", "Tone", RuleType::Validation);

        assert_eq!(
            rule.kind().unwrap(),
            RuleKind::Validation {
                check_for: vec![],
                min_items: None
            }
        );
    }

    #[test]
    fn format_rule_rejects_unknown_shape() {
        let rule = Rule::new("f", "Format", RuleType::Format).with_parameter("format", "haiku");

        let err = rule.kind().unwrap_err();
        assert_eq!(err.to_string(), "rule f has unknown format 'haiku'");
    }

    #[test]
    fn transformation_rule_parses_each_type() {
        let prefix = Rule::new("t1", "Prefix", RuleType::Transformation)
            .with_parameter("type", "add_prefix")
            .with_parameter("prefix", "DRAFT");
        let replace = Rule::new("t2", "Replace", RuleType::Transformation)
            .with_parameter("type", "replace")
            .with_parameter("find", "Client")
            .with_parameter("replace", "Acme");

        assert_eq!(
            prefix.kind().unwrap(),
            RuleKind::Transformation(Transformation::AddPrefix("DRAFT".to_string()))
        );
        assert_eq!(
            replace.kind().unwrap(),
            RuleKind::Transformation(Transformation::Replace {
                find: "Client".to_string(),
                replace: "Acme".to_string()
            })
        );
    }

    #[test]
    fn replace_transformation_requires_find() {
        let rule = Rule::new("t", "Replace", RuleType::Transformation).with_parameter("type", "replace");

        assert!(matches!(rule.kind(), Err(RuleParameterError::Missing { expected: "find", .. })));
    }

    #[test]
    fn rule_deserializes_from_wire_format() {
        let rule: Rule = serde_json::from_value(json!({
            "id": "pricing-format",
            "name": "Pricing Format",
            "type": "format",
            "description": "Pricing must include itemized costs",
            "enforcement": "strict",
            "parameters": {"format": "itemized"},
            "error_message": null
        }))
        .unwrap();

        assert_eq!(rule.rule_type, RuleType::Format);
        assert_eq!(rule.kind().unwrap(), RuleKind::Format(FormatShape::Itemized));
    }

    #[test]
    fn enforcement_defaults_to_strict() {
        let rule: Rule = serde_json::from_value(json!({
            "id": "c",
            "name": "Constraint",
            "type": "constraint"
        }))
        .unwrap();

        assert_eq!(rule.enforcement, Enforcement::Strict);
        assert!(rule.enforcement.is_blocking());
        assert!(!Enforcement::Warning.is_blocking());
    }
}
