//! In-memory schema registry.
//!
//! Schemas and the active pointer live behind a single `tokio::sync::RwLock`,
//! so lookups run concurrently while `register` and `set_active` are
//! serialized. Stored schemas are `Arc`s; replacing one never mutates a
//! snapshot already handed to a reader.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::schema::Schema;
use crate::ports::{SchemaRegistry, SchemaRegistryError, SchemaSummary};

#[derive(Default)]
struct State {
    schemas: HashMap<String, Arc<Schema>>,
    active: Option<String>,
}

/// Schema registry held in process memory.
///
/// # Example
///
/// ```ignore
/// let registry = InMemorySchemaRegistry::with_default_schema().await?;
///
/// let active = registry.get_active().await.expect("default is active");
/// let rules = registry.rules_for(&active.id, "pricing").await?;
/// ```
#[derive(Default)]
pub struct InMemorySchemaRegistry {
    state: RwLock<State>,
}

impl InMemorySchemaRegistry {
    /// Creates an empty registry with no active schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in proposal schema registered and active.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` if the built-in schema fails validation.
    pub async fn with_default_schema() -> Result<Self, SchemaRegistryError> {
        let registry = Self::new();
        let schema = registry.register(Schema::default_proposal()).await?;
        registry.set_active(&schema.id).await?;
        Ok(registry)
    }

    /// Number of registered schemas.
    pub async fn len(&self) -> usize {
        self.state.read().await.schemas.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SchemaRegistry for InMemorySchemaRegistry {
    async fn register(&self, schema: Schema) -> Result<Arc<Schema>, SchemaRegistryError> {
        if let Err(errors) = schema.validate() {
            warn!(schema_id = %schema.id, violations = errors.len(), "Rejected invalid schema");
            return Err(errors.into());
        }

        let schema = Arc::new(schema);
        let mut state = self.state.write().await;
        let replaced = state
            .schemas
            .insert(schema.id.clone(), Arc::clone(&schema))
            .is_some();

        info!(
            schema_id = %schema.id,
            version = %schema.version,
            sections = schema.sections.len(),
            replaced,
            "Schema registered"
        );
        Ok(schema)
    }

    async fn get(&self, schema_id: &str) -> Option<Arc<Schema>> {
        self.state.read().await.schemas.get(schema_id).cloned()
    }

    async fn list(&self) -> Vec<SchemaSummary> {
        let state = self.state.read().await;
        let mut summaries: Vec<_> = state
            .schemas
            .values()
            .map(|schema| SchemaSummary::of(schema, state.active.as_deref() == Some(&schema.id)))
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    async fn set_active(&self, schema_id: &str) -> Result<(), SchemaRegistryError> {
        let mut state = self.state.write().await;
        if !state.schemas.contains_key(schema_id) {
            return Err(SchemaRegistryError::NotFound(schema_id.to_string()));
        }
        state.active = Some(schema_id.to_string());
        info!(schema_id, "Active schema set");
        Ok(())
    }

    async fn get_active(&self) -> Option<Arc<Schema>> {
        let state = self.state.read().await;
        state
            .active
            .as_ref()
            .and_then(|id| state.schemas.get(id))
            .cloned()
    }
}
