//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - One chat-completion attempt against an LLM backend
//! - `SchemaRegistry` - Storage and activation of proposal schemas

mod ai_provider;
mod schema_registry;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, ProviderId, ProviderInfo, TokenUsage, UnknownProvider,
};
pub use schema_registry::{SchemaRegistry, SchemaRegistryError, SchemaSummary};
