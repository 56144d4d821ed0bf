//! Post-enforcement content rewrites.

use tracing::{debug, warn};

use crate::domain::schema::{Rule, RuleKind, RuleType, Transformation};

impl Transformation {
    /// Applies this rewrite to `content`.
    pub fn apply(&self, content: &str) -> String {
        match self {
            Transformation::AddPrefix(prefix) => format!("{}\n{}", prefix, content),
            Transformation::AddSuffix(suffix) => format!("{}\n{}", content, suffix),
            Transformation::Replace { find, replace } => content.replace(find.as_str(), replace),
        }
    }
}

/// Folds every `transformation` rule over `content`, in rule order.
///
/// Other rule types are ignored. A rule whose parameters do not describe a
/// valid transformation is logged and leaves the content unchanged.
pub fn apply_transformations(content: &str, rules: &[Rule]) -> String {
    rules
        .iter()
        .filter(|rule| rule.rule_type == RuleType::Transformation)
        .fold(content.to_string(), |current, rule| match rule.kind() {
            Ok(RuleKind::Transformation(transformation)) => {
                debug!(rule_id = %rule.id, "Applying transformation");
                transformation.apply(&current)
            }
            Ok(_) => current,
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "Skipping invalid transformation");
                current
            }
        })
}
