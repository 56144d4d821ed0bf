//! Prompt construction and reply parsing.

mod builder;
mod compression;
mod envelope;

pub use builder::{PromptBuilder, PromptError, PromptPair};
pub use compression::compress_prompt;
pub use envelope::ResponseEnvelope;
