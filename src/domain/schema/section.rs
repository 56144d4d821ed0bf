//! Section definitions within a proposal schema.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Rule;

/// Output format the LLM is asked to produce for a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
    Structured,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Structured => write!(f, "structured"),
        }
    }
}

/// One named subdivision of a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    /// Machine name, unique within a schema.
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Generation position, unique within a schema.
    pub order: i32,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub template: Option<String>,
}

fn default_required() -> bool {
    true
}

impl Section {
    /// Creates a required text section with no rules.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        display_name: impl Into<String>,
        order: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            required: true,
            order,
            rules: Vec::new(),
            output_format: OutputFormat::Text,
            min_length: None,
            max_length: None,
            template: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_length_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Marks the section as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn section_defaults_when_fields_omitted() {
        let section: Section = serde_json::from_value(json!({
            "id": "timeline",
            "name": "timeline",
            "display_name": "Project Timeline",
            "order": 3
        }))
        .unwrap();

        assert!(section.required);
        assert_eq!(section.output_format, OutputFormat::Text);
        assert!(section.rules.is_empty());
        assert_eq!(section.min_length, None);
    }

    #[test]
    fn output_format_serializes_lowercase() {
        let json = serde_json::to_string(&OutputFormat::Structured).unwrap();
        assert_eq!(json, "\"structured\"");
    }
}
