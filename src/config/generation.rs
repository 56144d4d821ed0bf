//! Generation configuration

use serde::Deserialize;

/// Settings for the proposal generation pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Collapse blank lines and trailing whitespace in prompts
    #[serde(default = "default_compress_prompts")]
    pub compress_prompts: bool,

    /// Schema file registered and activated at startup instead of the built-in default
    pub schema_file: Option<String>,
}

fn default_compress_prompts() -> bool {
    true
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            compress_prompts: default_compress_prompts(),
            schema_file: None,
        }
    }
}
