//! Pooled async SQLite handles over SeaORM.
//!
//! A [`Facade`] owns a worker runtime with a fixed number of execution lanes
//! and a registry of databases, each opened once per lane. Every operation
//! runs on that runtime, and bulk helpers cap how many operations are in
//! flight at once.

pub mod batch;
pub mod config;
pub mod error;
pub mod facade;
pub mod registry;
pub mod runtime;

pub use batch::{batched_for_each, BatchFailure, BatchSize, DEFAULT_BATCH_SIZE};
pub use config::{DatabaseConfig, DbKind, DbSettings, FacadeConfig, PoolSettings, Storage};
pub use error::{FacadeError, ShutdownError};
pub use facade::{
    Facade, FacadeBuilder, LifecycleState, MigrationCommand, MigrationStatus, ModelOf,
    QueryBuildable, ScopedFuture, ERR_REGISTRY_TORN_DOWN,
};
pub use registry::{DatabaseHandleBinding, DatabaseId, DatabaseRegistry};
pub use runtime::{ExecutionLane, ResourcePool};

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_support::logging::init();
}
