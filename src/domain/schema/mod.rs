//! Proposal schemas: sections, rules and their structural invariants.
//!
//! - `Schema` - named, versioned set of ordered sections plus global rules
//! - `Section` - one proposal subdivision with its own rules and format
//! - `Rule` / `RuleKind` - wire record and its typed interpretation

mod aggregate;
mod defaults;
mod errors;
mod rule;
mod section;

pub use aggregate::Schema;
pub use defaults::DEFAULT_SCHEMA_ID;
pub use errors::{SchemaValidationErrors, SchemaViolation};
pub use rule::{
    Enforcement, FormatShape, Parameters, Rule, RuleKind, RuleParameterError, RuleType,
    Transformation,
};
pub use section::{OutputFormat, Section};
