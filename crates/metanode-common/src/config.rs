//! Configuration types for the metadata store
//!
//! This module defines the tuning knobs of the in-memory metadata trees.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default branching factor of the metadata trees
pub const DEFAULT_DEGREE: usize = 32;

/// Prefix for environment overrides (e.g. `METANODE_DEGREE=64`)
pub const ENV_PREFIX: &str = "METANODE";

/// Metadata tree configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaTreeConfig {
    /// Branching factor of the ordered index (default: 32).
    /// Only affects performance, never observable behaviour.
    pub degree: usize,
}

impl Default for MetaTreeConfig {
    fn default() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
        }
    }
}

impl MetaTreeConfig {
    /// Create config with the given degree
    #[must_use]
    pub const fn with_degree(degree: usize) -> Self {
        Self { degree }
    }

    /// Load configuration from a file, with `METANODE_*` environment
    /// variables layered on top.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(path.as_ref(), None)
    }

    /// Load from `path`, reading overrides from `env` instead of the
    /// process environment when given.
    fn load_with_env(path: &Path, env: Option<::config::Map<String, String>>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .map_err(|e| Error::configuration(format!("failed to read {}: {e}", path.display())))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.degree < 2 {
            return Err(Error::configuration(format!(
                "degree must be at least 2, got {}",
                self.degree
            )));
        }
        Ok(())
    }
}
