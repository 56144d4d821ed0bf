//! Proposal Engine - Schema-driven business proposal generation
//!
//! Turns free-text survey notes into proposal sections with an LLM, then
//! checks each section against administrator-defined rules and applies
//! deterministic post-processing.
//!
//! - `domain` - schemas, rules, prompt construction, enforcement, results
//! - `ports` - provider and schema registry interfaces
//! - `adapters` - HTTP/mock providers, the LLM gateway, registry storage
//! - `application` - the generation handler
//! - `config` - environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
