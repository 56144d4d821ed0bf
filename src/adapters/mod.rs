//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - LLM providers and the retrying, fallback-capable gateway
//! - `schema` - Schema registry storage and schema files

pub mod ai;
pub mod schema;

pub use ai::{LlmGateway, MockAIProvider, OpenAIProvider};
pub use schema::InMemorySchemaRegistry;
