//! Configuration for the facade, its resource pool and its databases.

pub mod db;
pub mod pool;

use std::str::FromStr;

pub use db::{DatabaseConfig, DbKind, DbSettings, Storage};
pub use pool::PoolSettings;

use crate::error::FacadeError;

/// Top-level configuration used by [`crate::Facade::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeConfig {
    pub pool: PoolSettings,
    /// Configuration registered under the default database id
    pub database: DatabaseConfig,
    /// Label attached to every log line emitted by the handle
    pub label: String,
}

impl FacadeConfig {
    pub fn new(database: DatabaseConfig) -> Self {
        Self {
            pool: PoolSettings::default(),
            database,
            label: "sealite".to_string(),
        }
    }

    pub fn memory() -> Self {
        Self::new(DatabaseConfig::memory())
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.pool.threads = threads;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    /// Load everything from `SEALITE_*` environment variables.
    pub fn from_env() -> Result<Self, FacadeError> {
        let label = std::env::var("SEALITE_LABEL").unwrap_or_else(|_| "sealite".to_string());
        Ok(Self {
            pool: PoolSettings::from_env()?,
            database: DatabaseConfig::from_env()?,
            label,
        })
    }

    pub fn validate(&self) -> Result<(), FacadeError> {
        self.pool.validate()?;
        self.database.validate()
    }
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self::memory()
    }
}

/// Read and parse an optional environment variable, falling back to `default` when unset.
pub(crate) fn env_or<T>(name: &str, default: T) -> Result<T, FacadeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| {
            FacadeError::config(format!(
                "environment variable '{name}' has invalid value '{raw}': {e}"
            ))
        }),
        Err(_) => Ok(default),
    }
}
