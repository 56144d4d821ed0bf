//! Schema files on disk (JSON or YAML, chosen by extension).

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::domain::schema::Schema;

/// Errors reading or parsing a schema file.
#[derive(Debug, Error)]
pub enum SchemaFileError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON schema file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML schema file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported schema file extension '{0}' (expected json, yaml or yml)")]
    UnsupportedExtension(String),
}

/// Reads and parses a schema file. Structural validation is left to the registry.
pub fn load_schema_file(path: impl AsRef<Path>) -> Result<Schema, SchemaFileError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let raw = std::fs::read_to_string(path).map_err(|source| SchemaFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let schema = parse_schema(&raw, &extension)?;
    debug!(path = %path.display(), schema_id = %schema.id, "Schema file loaded");
    Ok(schema)
}

/// Parses schema text in the format named by `extension`.
pub fn parse_schema(raw: &str, extension: &str) -> Result<Schema, SchemaFileError> {
    match extension {
        "json" => Ok(serde_json::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        other => Err(SchemaFileError::UnsupportedExtension(other.to_string())),
    }
}
