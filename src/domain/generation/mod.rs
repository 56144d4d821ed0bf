//! Proposal generation results.

mod result;

pub use result::{GeneratedSection, GenerationResult, SectionInsight};
