//! Schema registry adapters and schema file loading.

mod file;
mod in_memory;

pub use file::{load_schema_file, parse_schema, SchemaFileError};
pub use in_memory::InMemorySchemaRegistry;
