//! Runtime settings.
//!
//! Read from an optional `warikan.toml` in the working directory, then
//! overridden by `WARIKAN_*` environment variables (`__` separates nested
//! keys, e.g. `WARIKAN_LIMITS__MAX_AMOUNT=50000`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;

use crate::validation::Limits;

const DEFAULT_CONFIG_NAME: &str = "warikan";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub limits: Limits,
    /// Number of memoized calculation results; 0 disables the cache.
    pub cache_capacity: usize,
    /// Where the event is saved. Nothing is persisted when unset.
    pub storage_path: Option<PathBuf>,
    pub persist_debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            cache_capacity: 32,
            storage_path: None,
            persist_debounce_ms: 300,
        }
    }
}

impl Settings {
    /// Load from `warikan.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name(DEFAULT_CONFIG_NAME).required(false))
    }

    /// Load from the given file, which must exist, and the environment.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    fn build(file: impl Source + Send + Sync + 'static) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("WARIKAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings
            .limits
            .check()
            .map_err(|e| ConfigError::Message(format!("limits: {e}")))?;
        Ok(settings)
    }
}
