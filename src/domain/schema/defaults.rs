//! Built-in proposal schema registered at startup.

use serde_json::json;

use super::{Enforcement, OutputFormat, Rule, RuleType, Schema, Section};

/// Identifier of the built-in schema.
pub const DEFAULT_SCHEMA_ID: &str = "default-proposal-schema";

impl Schema {
    /// The default business proposal: executive summary, scope of work,
    /// timeline and pricing, with placeholder detection applied globally.
    pub fn default_proposal() -> Self {
        Schema::new(DEFAULT_SCHEMA_ID, "Default Proposal Schema", "1.0.0")
            .with_description("Default schema for business proposals")
            .with_metadata("created_by", "system")
            .with_section(executive_summary())
            .with_section(scope_of_work())
            .with_section(timeline())
            .with_section(pricing())
            .with_global_rule(
                Rule::new("global-no-mock-data", "No Mock Data", RuleType::Validation)
                    .with_description(
                        "Content must be based on actual survey notes, not placeholder text",
                    )
                    .with_parameter(
                        "check_for",
                        json!(["lorem ipsum", "placeholder", "example", "TODO"]),
                    )
                    .with_error_message("Content contains placeholder or mock data"),
            )
            .with_global_rule(
                Rule::new("global-professional-tone", "Professional Tone", RuleType::Validation)
                    .with_description("Content must maintain professional business tone")
                    .with_enforcement(Enforcement::Advisory)
                    .with_error_message("Content should maintain professional tone"),
            )
    }
}

fn executive_summary() -> Section {
    Section::new("exec-summary", "executive_summary", "Executive Summary", 1)
        .with_description("High-level overview of the proposal")
        .with_length_bounds(Some(200), Some(1000))
        .with_rule(
            Rule::new("exec-summary-length", "Length Constraint", RuleType::Length)
                .with_description("Executive summary must be 200-1000 characters")
                .with_parameter("min", 200)
                .with_parameter("max", 1000)
                .with_error_message("Executive summary must be between 200 and 1000 characters"),
        )
        .with_rule(
            Rule::new(
                "exec-summary-required-fields",
                "Required Information",
                RuleType::RequiredField,
            )
            .with_description("Must mention project scope and objectives")
            .with_enforcement(Enforcement::Warning)
            .with_parameter("fields", json!(["scope", "objectives"]))
            .with_error_message("Executive summary should mention project scope and objectives"),
        )
}

fn scope_of_work() -> Section {
    Section::new("scope-of-work", "scope_of_work", "Scope of Work", 2)
        .with_description("Detailed breakdown of work to be performed")
        .with_output_format(OutputFormat::Structured)
        .with_rule(
            Rule::new("scope-structured-format", "Structured Format", RuleType::Format)
                .with_description("Scope must be structured as list of items")
                .with_parameter("format", "list")
                .with_error_message("Scope of work must be formatted as a structured list"),
        )
        .with_rule(
            Rule::new("scope-min-items", "Minimum Items", RuleType::Validation)
                .with_description("Must have at least 3 work items")
                .with_enforcement(Enforcement::Warning)
                .with_parameter("min_items", 3)
                .with_error_message("Scope should include at least 3 work items"),
        )
}

fn timeline() -> Section {
    Section::new("timeline", "timeline", "Project Timeline", 3)
        .with_description("Estimated timeline and milestones")
        .with_output_format(OutputFormat::Structured)
        .with_rule(
            Rule::new("timeline-format", "Timeline Format", RuleType::Format)
                .with_description("Timeline must include phases with durations")
                .with_parameter("format", "phases_with_duration")
                .with_error_message("Timeline must be structured with phases and durations"),
        )
}

fn pricing() -> Section {
    Section::new("pricing", "pricing", "Pricing", 4)
        .with_description("Cost breakdown and pricing information")
        .with_output_format(OutputFormat::Structured)
        .with_rule(
            Rule::new("pricing-format", "Pricing Format", RuleType::Format)
                .with_description("Pricing must include itemized costs")
                .with_parameter("format", "itemized")
                .with_error_message("Pricing must be itemized with clear cost breakdown"),
        )
        .with_rule(
            Rule::new("pricing-disclaimer", "Pricing Disclaimer", RuleType::RequiredField)
                .with_description("Must include disclaimer if estimates are preliminary")
                .with_parameter("field", "disclaimer")
                .with_error_message("Pricing must include disclaimer for preliminary estimates"),
        )
}
