use std::time::Duration;

use super::env_or;
use crate::error::FacadeError;

/// Sizing and shutdown behaviour of a [`crate::ResourcePool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Worker threads, blocking threads and execution lanes are all sized from this
    pub threads: usize,
    pub thread_name_prefix: String,
    /// Upper bound for draining in-flight work and for stopping the runtime
    pub shutdown_grace: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            threads: num_cpus::get().max(1),
            thread_name_prefix: "sealite".to_string(),
            shutdown_grace: Duration::from_millis(5000),
        }
    }
}

impl PoolSettings {
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads,
            ..Self::default()
        }
    }

    /// Load from `SEALITE_THREADS` and `SEALITE_SHUTDOWN_GRACE_MS`.
    pub fn from_env() -> Result<Self, FacadeError> {
        let defaults = Self::default();
        let settings = Self {
            threads: env_or("SEALITE_THREADS", defaults.threads)?,
            shutdown_grace: Duration::from_millis(env_or(
                "SEALITE_SHUTDOWN_GRACE_MS",
                defaults.shutdown_grace.as_millis() as u64,
            )?),
            ..defaults
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), FacadeError> {
        if self.threads == 0 {
            return Err(FacadeError::config("thread count must be at least 1"));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(FacadeError::config("thread name prefix must not be empty"));
        }
        Ok(())
    }
}
