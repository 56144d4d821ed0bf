//! Schema registry port.
//!
//! Holds validated proposal schemas and the pointer to the active one.
//! Readers receive shared snapshots (`Arc<Schema>`), so a schema replaced
//! mid-request does not change under an in-flight generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::schema::{Rule, Schema, SchemaValidationErrors};

/// Registry port for proposal schemas.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Validate and store a schema, replacing any schema with the same id.
    ///
    /// # Errors
    ///
    /// - `Invalid` with every structural violation found
    async fn register(&self, schema: Schema) -> Result<Arc<Schema>, SchemaRegistryError>;

    /// Find a schema by id.
    async fn get(&self, schema_id: &str) -> Option<Arc<Schema>>;

    /// Summaries of all registered schemas, sorted by id.
    async fn list(&self) -> Vec<SchemaSummary>;

    /// Mark a registered schema as active.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no schema has this id
    async fn set_active(&self, schema_id: &str) -> Result<(), SchemaRegistryError>;

    /// The active schema, if one has been set.
    async fn get_active(&self) -> Option<Arc<Schema>>;

    /// Global rules followed by the section's own rules.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the schema is unknown
    /// - `SectionNotFound` if the schema has no such section
    async fn rules_for(
        &self,
        schema_id: &str,
        section_name: &str,
    ) -> Result<Vec<Rule>, SchemaRegistryError> {
        let schema = self
            .get(schema_id)
            .await
            .ok_or_else(|| SchemaRegistryError::NotFound(schema_id.to_string()))?;
        schema
            .rules_for(section_name)
            .ok_or_else(|| SchemaRegistryError::SectionNotFound {
                schema_id: schema_id.to_string(),
                section: section_name.to_string(),
            })
    }
}

/// Listing entry for a registered schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    /// Number of sections.
    pub sections: usize,
    /// Number of global rules.
    pub global_rules: usize,
    pub is_active: bool,
}

impl SchemaSummary {
    pub fn of(schema: &Schema, is_active: bool) -> Self {
        Self {
            id: schema.id.clone(),
            name: schema.name.clone(),
            version: schema.version.clone(),
            description: schema.description.clone(),
            sections: schema.sections.len(),
            global_rules: schema.global_rules.len(),
            is_active,
        }
    }
}

/// Schema registry errors.
#[derive(Debug, Clone, Error)]
pub enum SchemaRegistryError {
    #[error(transparent)]
    Invalid(#[from] SchemaValidationErrors),

    #[error("schema not found: {0}")]
    NotFound(String),

    #[error("section '{section}' not found in schema {schema_id}")]
    SectionNotFound { schema_id: String, section: String },
}
