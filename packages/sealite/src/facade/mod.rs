//! The top-level database handle.

mod crud;
mod migrate;
mod query;
mod scoped;

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use tracing::{debug_span, info, info_span, Instrument, Span};

pub use crud::ModelOf;
pub use migrate::{MigrationCommand, MigrationStatus};
pub use query::QueryBuildable;
pub use scoped::ScopedFuture;

use crate::config::{DatabaseConfig, FacadeConfig};
use crate::error::FacadeError;
use crate::registry::{DatabaseHandleBinding, DatabaseId, DatabaseRegistry};
use crate::runtime::{ResourcePool, Snapshot};

/// Panic message for resolving a binding after the registry was torn down
/// while the handle still reported itself active.
pub const ERR_REGISTRY_TORN_DOWN: &str =
    "database registry torn down while the facade was active; this is a bug in lifecycle ordering";

/// Observable lifecycle of a handle. Transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Active,
    ShuttingDown,
    Closed,
}

#[derive(Clone)]
struct Resources {
    pool: Arc<ResourcePool>,
    registry: Arc<DatabaseRegistry>,
}

enum Lifecycle {
    Active(Resources),
    ShuttingDown,
    Closed,
}

/// Owns a resource pool and a database registry as one unit.
///
/// Build one with [`Facade::builder`], [`Facade::new`] or [`Facade::memory`]
/// and shut it down with [`Facade::shutdown`]. Dropping an active handle
/// performs the same teardown on a best-effort basis.
pub struct Facade {
    label: String,
    span: Span,
    default_id: DatabaseId,
    lifecycle: RwLock<Lifecycle>,
}

/// Collects configuration for a [`Facade`] that has not started yet.
#[derive(Debug, Clone)]
pub struct FacadeBuilder {
    config: FacadeConfig,
    default_id: DatabaseId,
    extra: Vec<(DatabaseId, DatabaseConfig)>,
}

impl FacadeBuilder {
    pub fn new() -> Self {
        Self::from_config(FacadeConfig::default())
    }

    pub fn from_config(config: FacadeConfig) -> Self {
        Self {
            config,
            default_id: DatabaseId::default(),
            extra: Vec::new(),
        }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.config.pool.threads = threads;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Configuration registered under the default id.
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.config.database = database;
        self
    }

    pub fn default_id(mut self, id: impl Into<DatabaseId>) -> Self {
        self.default_id = id.into();
        self
    }

    /// Register an additional named database at start.
    pub fn register(mut self, id: impl Into<DatabaseId>, database: DatabaseConfig) -> Self {
        self.extra.push((id.into(), database));
        self
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::Uninitialized
    }

    /// Start the pool and open every configured database.
    ///
    /// On failure everything started so far is shut down again.
    pub async fn start(self) -> Result<Facade, FacadeError> {
        self.config.validate()?;
        let FacadeBuilder {
            config,
            default_id,
            extra,
        } = self;

        let span = info_span!("sealite", label = %config.label);
        let threads = config.pool.threads;
        let pool = Arc::new(ResourcePool::new(config.pool));
        pool.start()?;
        let registry = Arc::new(DatabaseRegistry::new());

        let opened = async {
            registry
                .register(&pool, default_id.clone(), config.database, true)
                .await?;
            for (id, database) in extra {
                registry.register(&pool, id, database, false).await?;
            }
            Ok::<_, FacadeError>(())
        }
        .instrument(span.clone())
        .await;

        if let Err(e) = opened {
            registry.shutdown().await;
            pool.close().await;
            return Err(e);
        }

        info!(parent: &span, lifecycle = "active", threads = threads, "facade started");
        Ok(Facade {
            label: config.label,
            span,
            default_id,
            lifecycle: RwLock::new(Lifecycle::Active(Resources { pool, registry })),
        })
    }
}

impl Default for FacadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Facade {
    pub fn builder() -> FacadeBuilder {
        FacadeBuilder::new()
    }

    pub async fn new(config: FacadeConfig) -> Result<Self, FacadeError> {
        FacadeBuilder::from_config(config).start().await
    }

    /// Independent handle over a private in-memory database.
    pub async fn memory() -> Result<Self, FacadeError> {
        Self::new(FacadeConfig::memory().with_label("sealite.memory")).await
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn default_database(&self) -> &DatabaseId {
        &self.default_id
    }

    pub fn state(&self) -> LifecycleState {
        match &*self.lifecycle.read() {
            Lifecycle::Active(_) => LifecycleState::Active,
            Lifecycle::ShuttingDown => LifecycleState::ShuttingDown,
            Lifecycle::Closed => LifecycleState::Closed,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Number of execution lanes, or zero once shut down.
    pub fn lane_count(&self) -> usize {
        self.resources().map_or(0, |r| r.pool.lane_count())
    }

    /// Pool counters, or `None` once shut down.
    pub fn stats(&self) -> Option<Snapshot> {
        self.resources().ok().map(|r| r.pool.counters().snapshot())
    }

    /// Registered database ids.
    pub fn databases(&self) -> Vec<DatabaseId> {
        self.resources()
            .map(|r| r.registry.ids())
            .unwrap_or_default()
    }

    pub async fn register_database(
        &self,
        id: impl Into<DatabaseId>,
        database: DatabaseConfig,
    ) -> Result<(), FacadeError> {
        let resources = self.resources()?;
        resources
            .registry
            .register(&resources.pool, id.into(), database, false)
            .instrument(self.span.clone())
            .await
    }

    fn resources(&self) -> Result<Resources, FacadeError> {
        match &*self.lifecycle.read() {
            Lifecycle::Active(resources) => Ok(resources.clone()),
            _ => Err(FacadeError::PoolClosed),
        }
    }

    fn bind(
        &self,
        id: Option<&DatabaseId>,
    ) -> Result<(Arc<ResourcePool>, DatabaseHandleBinding), FacadeError> {
        let guard = self.lifecycle.read();
        let Lifecycle::Active(resources) = &*guard else {
            return Err(FacadeError::PoolClosed);
        };

        let id = id.unwrap_or(&self.default_id);
        if !resources.registry.contains(id) {
            return Err(FacadeError::UnknownDatabase(id.to_string()));
        }

        let lane = resources.pool.next_lane()?;
        match resources.registry.handle(id, lane, &self.span) {
            Some(binding) => Ok((Arc::clone(&resources.pool), binding)),
            None => panic!("{ERR_REGISTRY_TORN_DOWN}"),
        }
    }

    /// Run `f` against one lane's connection on the pool runtime.
    async fn run_bound<T, E, F, Fut>(
        &self,
        op: &'static str,
        id: Option<&DatabaseId>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(DatabaseConnection) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<FacadeError> + Send + 'static,
    {
        let (pool, binding) = self.bind(id)?;
        let span = debug_span!(
            parent: binding.span(),
            "op",
            op = op,
            lane = binding.lane().index(),
            database = %binding.id()
        );

        let out = pool
            .run(f(binding.into_connection()).instrument(span))
            .await?;
        if out.is_err() {
            pool.counters().failed();
        }
        out
    }

    /// Stop admitting work, drain in-flight operations, close every database
    /// and stop the pool. Safe to call more than once.
    ///
    /// Dropping the returned future early still leaves the handle `Closed`;
    /// whatever was not yet closed is torn down synchronously instead.
    pub async fn shutdown(&self) {
        let resources = {
            let mut lifecycle = self.lifecycle.write();
            match std::mem::replace(&mut *lifecycle, Lifecycle::ShuttingDown) {
                Lifecycle::Active(resources) => resources,
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };
        info!(parent: &self.span, lifecycle = "shutting_down", "facade shutting down");

        let Resources { pool, registry } = resources.clone();
        let mut guard = ShutdownGuard {
            lifecycle: &self.lifecycle,
            span: &self.span,
            resources: Some(resources),
        };

        if let Err(reason) = pool.drain().await {
            tracing::warn!(parent: &self.span, reason = %reason, "facade shutdown continuing after drain timeout");
        }

        // lane pools were opened on the worker runtime; close them there too
        match pool.runtime_handle() {
            Some(handle) => {
                let closing = Arc::clone(&registry);
                if handle.spawn(async move { closing.shutdown().await }).await.is_err() {
                    registry.teardown();
                }
            }
            None => registry.shutdown().await,
        }

        pool.close().await;
        pool.counters().log_snapshot(&self.label);
        guard.resources = None;
        drop(guard);
        info!(parent: &self.span, lifecycle = "closed", "facade closed");
    }
}

/// Moves a shutting-down handle to `Closed` however the shutdown future ends.
struct ShutdownGuard<'a> {
    lifecycle: &'a RwLock<Lifecycle>,
    span: &'a Span,
    resources: Option<Resources>,
}

impl Drop for ShutdownGuard<'_> {
    fn drop(&mut self) {
        if let Some(Resources { pool, registry }) = self.resources.take() {
            tracing::warn!(parent: self.span, "facade shutdown cancelled; tearing down synchronously");
            registry.teardown();
            pool.shutdown_graceful();
        }
        *self.lifecycle.write() = Lifecycle::Closed;
    }
}

impl Drop for Facade {
    fn drop(&mut self) {
        let lifecycle = std::mem::replace(self.lifecycle.get_mut(), Lifecycle::Closed);
        if let Lifecycle::Active(Resources { pool, registry }) = lifecycle {
            registry.teardown();
            pool.shutdown_graceful();
        }
    }
}

impl std::fmt::Debug for Facade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facade")
            .field("label", &self.label)
            .field("state", &self.state())
            .field("default_id", &self.default_id)
            .finish()
    }
}
