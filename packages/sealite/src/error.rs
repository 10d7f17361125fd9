use std::time::Duration;

use sea_orm::DbErr;
use thiserror::Error;

/// Errors surfaced to callers of the facade, the pool, and the registry.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// The pool was shut down (or never started); build a new handle to continue.
    #[error("resource pool closed")]
    PoolClosed,
    #[error("resource pool already started")]
    AlreadyStarted,
    #[error("failed to start resource pool: {source}")]
    PoolStart {
        #[source]
        source: std::io::Error,
    },
    /// Schema operation failed; the driver error is kept unchanged.
    #[error("migration failed: {0}")]
    MigrationFailed(#[source] DbErr),
    /// Save, update, delete or query failed; the driver error is kept unchanged.
    #[error("operation failed: {0}")]
    OperationFailed(#[from] DbErr),
    /// A bulk operation failed partway. Items already applied are not rolled back.
    #[error("batch failed after {succeeded} of {total} items succeeded: {source}")]
    BatchPartialFailure {
        succeeded: usize,
        total: usize,
        #[source]
        source: Box<FacadeError>,
    },
    /// A lane connection pool could not be opened or warmed up.
    #[error("{context}: {source}")]
    Connect {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("configuration error: {message}")]
    Config { message: String },
    #[error("database `{0}` is not registered")]
    UnknownDatabase(String),
}

impl FacadeError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            FacadeError::PoolClosed => "POOL_CLOSED",
            FacadeError::AlreadyStarted => "POOL_ALREADY_STARTED",
            FacadeError::PoolStart { .. } => "POOL_START_FAILED",
            FacadeError::MigrationFailed(_) => "MIGRATION_FAILED",
            FacadeError::OperationFailed(_) => "OPERATION_FAILED",
            FacadeError::BatchPartialFailure { .. } => "BATCH_PARTIAL_FAILURE",
            FacadeError::Connect { .. } => "CONNECT_FAILED",
            FacadeError::Config { .. } => "CONFIG_ERROR",
            FacadeError::UnknownDatabase(_) => "UNKNOWN_DATABASE",
        }
    }

    /// The driver error behind this failure, looking through batch wrappers.
    pub fn db_err(&self) -> Option<&DbErr> {
        match self {
            FacadeError::MigrationFailed(e) | FacadeError::OperationFailed(e) => Some(e),
            FacadeError::BatchPartialFailure { source, .. } => source.db_err(),
            _ => None,
        }
    }

    pub(crate) fn connect(context: &'static str, source: sqlx::Error) -> Self {
        Self::Connect { context, source }
    }

    pub fn is_pool_closed(&self) -> bool {
        match self {
            FacadeError::PoolClosed => true,
            FacadeError::BatchPartialFailure { source, .. } => source.is_pool_closed(),
            _ => false,
        }
    }
}

/// Reasons a pool could not be stopped synchronously. Logged, never returned.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("blocking shutdown requested from inside an async context")]
    BlockingContext,
    #[error("in-flight operations did not drain within {0:?}")]
    DrainTimeout(Duration),
    #[error("shutdown thread could not be spawned: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}
