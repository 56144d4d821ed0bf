//! Rule enforcement: evaluating generated content against schema rules and
//! applying post-processing transformations.

mod enforcer;
mod patterns;
mod result;
mod transform;
mod violation;

pub use enforcer::{RuleEnforcer, RuleEvaluationError};
pub use patterns::count_list_items;
pub use result::EnforcementResult;
pub use transform::apply_transformations;
pub use violation::Violation;
