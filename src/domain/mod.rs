//! Domain layer containing the proposal model and its pure services.
//!
//! # Module Organization
//!
//! - `schema` - Proposal schemas, sections and rules with structural validation
//! - `prompt` - Section prompt construction and model reply parsing
//! - `enforcement` - Rule evaluation and post-processing transformations
//! - `generation` - Generated sections and aggregate generation results

pub mod enforcement;
pub mod generation;
pub mod prompt;
pub mod schema;
