//! Persistence configuration.

use std::path::{Path, PathBuf};

/// Default location of the data file, relative to the working directory.
pub const DEFAULT_DATA_FILE: &str = "plugins/metadata/data.toml";

/// The environment variable used to override the data file location.
pub const DATA_FILE_ENV: &str = "PERSIST_DATA_FILE";

/// How often the document is re-read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadPolicy {
    /// Re-read the file before every access so changes made by other
    /// writers between our writes are picked up.
    #[default]
    ReadThrough,
    /// Keep the parsed document in memory after the first read. Changes made
    /// to the file by anyone else are not seen and will be overwritten.
    Cached,
}

/// Configuration for a persistence store.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Path of the TOML data file.
    pub data_file: PathBuf,
    /// Reload policy for the document.
    pub reload: ReloadPolicy,
}

impl PersistenceConfig {
    /// Create a config for the given data file with the default reload policy.
    #[must_use]
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            reload: ReloadPolicy::default(),
        }
    }

    /// Use the path from the `PERSIST_DATA_FILE` environment variable,
    /// falling back to [`DEFAULT_DATA_FILE`].
    #[must_use]
    pub fn from_env() -> Self {
        let path = std::env::var_os(DATA_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));
        Self::new(path)
    }

    /// Override the reload policy.
    #[must_use]
    pub fn with_reload_policy(mut self, reload: ReloadPolicy) -> Self {
        self.reload = reload;
        self
    }

    #[must_use]
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_FILE)
    }
}
