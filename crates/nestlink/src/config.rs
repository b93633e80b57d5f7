//! Engine configuration.
//!
//! Built in code with the `with_*` methods, or loaded from a TOML file:
//!
//! ```toml
//! id_field = "id"
//! strict_payload = true
//! max_batch_concurrency = 8
//! ```

use crate::error::{LinkError, LinkResult};
use serde::Deserialize;
use std::path::Path;

/// Configuration shared by every relation and hook built by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Name of the primary key field on every record.
    pub id_field: String,
    /// Reject unknown keys inside relation sub-documents.
    pub strict_payload: bool,
    /// Upper bound on in-flight per-id operations in a batch. `None` means unbounded.
    pub max_batch_concurrency: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            strict_payload: true,
            max_batch_concurrency: None,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary key field name.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Toggle rejection of unknown relation sub-document keys.
    pub fn with_strict_payload(mut self, strict: bool) -> Self {
        self.strict_payload = strict;
        self
    }

    /// Limit how many per-id operations of one batch run at the same time.
    pub fn with_max_batch_concurrency(mut self, limit: usize) -> Self {
        self.max_batch_concurrency = Some(limit);
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> LinkResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> LinkResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LinkError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            LinkError::Config(msg) => {
                LinkError::config(format!("invalid config file {}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn validate(&self) -> LinkResult<()> {
        if self.id_field.trim().is_empty() {
            return Err(LinkError::config("id_field must not be empty"));
        }
        if self.max_batch_concurrency == Some(0) {
            return Err(LinkError::config(
                "max_batch_concurrency must be greater than zero",
            ));
        }
        Ok(())
    }
}
