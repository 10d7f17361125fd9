//! Named database configurations bound to a resource pool.

mod connect;

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use tracing::{debug, info, warn, Span};

use crate::config::DatabaseConfig;
use crate::error::FacadeError;
use crate::runtime::{ExecutionLane, ResourcePool};

/// Name of a registered database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseId(String);

impl DatabaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DatabaseId {
    fn default() -> Self {
        Self("sqlite".to_string())
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatabaseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DatabaseId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A database connection resolved for one lane, valid for one operation.
#[derive(Debug, Clone)]
pub struct DatabaseHandleBinding {
    id: DatabaseId,
    lane: ExecutionLane,
    connection: DatabaseConnection,
    span: Span,
}

impl DatabaseHandleBinding {
    pub fn id(&self) -> &DatabaseId {
        &self.id
    }

    pub fn lane(&self) -> ExecutionLane {
        self.lane
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn into_connection(self) -> DatabaseConnection {
        self.connection
    }
}

struct RegisteredDatabase {
    config: DatabaseConfig,
    lanes: Vec<DatabaseConnection>,
}

/// Registry of database configurations, each holding one connection pool per lane.
///
/// Torn down exactly once; afterwards [`DatabaseRegistry::handle`] returns `None`.
pub struct DatabaseRegistry {
    databases: RwLock<Option<HashMap<DatabaseId, RegisteredDatabase>>>,
    default_id: RwLock<DatabaseId>,
}

impl DatabaseRegistry {
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(Some(HashMap::new())),
            default_id: RwLock::new(DatabaseId::default()),
        }
    }

    /// Open `config` on every lane of `pool` and store it under `id`.
    pub async fn register(
        &self,
        pool: &ResourcePool,
        id: DatabaseId,
        config: DatabaseConfig,
        is_default: bool,
    ) -> Result<(), FacadeError> {
        config.validate()?;
        self.ensure_vacant(&id)?;

        let lanes = pool.lane_count();
        let to_connect = config.clone();
        let connections = pool
            .run(async move { connect::connect_lanes(&to_connect, lanes).await })
            .await??;

        {
            let mut guard = self.databases.write();
            let databases = guard.as_mut().ok_or(FacadeError::PoolClosed)?;
            if databases.contains_key(&id) {
                return Err(duplicate(&id));
            }
            databases.insert(
                id.clone(),
                RegisteredDatabase {
                    config,
                    lanes: connections,
                },
            );
        }

        if is_default {
            *self.default_id.write() = id.clone();
        }
        info!(database = %id, lanes = lanes, is_default = is_default, "database registered");
        Ok(())
    }

    fn ensure_vacant(&self, id: &DatabaseId) -> Result<(), FacadeError> {
        match &*self.databases.read() {
            None => Err(FacadeError::PoolClosed),
            Some(databases) if databases.contains_key(id) => Err(duplicate(id)),
            Some(_) => Ok(()),
        }
    }

    /// Resolve the connection for `id` on `lane`.
    ///
    /// `None` when the registry has been torn down or `id` is unknown.
    pub fn handle(
        &self,
        id: &DatabaseId,
        lane: ExecutionLane,
        span: &Span,
    ) -> Option<DatabaseHandleBinding> {
        let guard = self.databases.read();
        let registered = guard.as_ref()?.get(id)?;
        let connection = registered
            .lanes
            .get(lane.index() % registered.lanes.len().max(1))?
            .clone();

        Some(DatabaseHandleBinding {
            id: id.clone(),
            lane,
            connection,
            span: span.clone(),
        })
    }

    pub fn default_id(&self) -> DatabaseId {
        self.default_id.read().clone()
    }

    pub fn contains(&self, id: &DatabaseId) -> bool {
        self.databases
            .read()
            .as_ref()
            .is_some_and(|databases| databases.contains_key(id))
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<DatabaseId> {
        let mut ids: Vec<DatabaseId> = self
            .databases
            .read()
            .as_ref()
            .map(|databases| databases.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn config(&self, id: &DatabaseId) -> Option<DatabaseConfig> {
        self.databases
            .read()
            .as_ref()?
            .get(id)
            .map(|registered| registered.config.clone())
    }

    pub fn is_torn_down(&self) -> bool {
        self.databases.read().is_none()
    }

    /// Close every lane pool. Idempotent.
    pub async fn shutdown(&self) {
        let Some(databases) = self.databases.write().take() else {
            return;
        };

        for (id, registered) in databases {
            for (lane, connection) in registered.lanes.into_iter().enumerate() {
                if let Err(e) = connection.close().await {
                    warn!(database = %id, lane = lane, error = %e, "failed to close lane pool");
                }
            }
            debug!(database = %id, "database closed");
        }
    }

    /// Drop every lane pool without waiting for connections to close.
    pub fn teardown(&self) {
        if let Some(databases) = self.databases.write().take() {
            debug!(databases = databases.len(), "registry torn down");
        }
    }
}

impl Default for DatabaseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DatabaseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseRegistry")
            .field("ids", &self.ids())
            .field("default_id", &self.default_id())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

fn duplicate(id: &DatabaseId) -> FacadeError {
    FacadeError::config(format!("database `{id}` is already registered"))
}
