use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::env_or;
use crate::error::FacadeError;

const MEMORY_PATH: &str = ":memory:";

/// Kind of SQLite database behind a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbKind {
    SqliteMemory,
    SqliteFile,
}

/// Where the SQLite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Private in-memory database, shared by every lane of one registration only
    Memory,
    /// On-disk database, created if missing
    File(PathBuf),
}

/// Per-connection session settings applied in the `after_connect` hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSettings {
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
            foreign_keys: true,
        }
    }
}

/// A named database configuration as registered with the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub storage: Storage,
    /// Size of the sqlx pool owned by each execution lane
    pub max_connections_per_lane: u32,
    pub acquire_timeout_ms: u64,
    pub settings: DbSettings,
}

impl DatabaseConfig {
    pub fn memory() -> Self {
        Self {
            storage: Storage::Memory,
            max_connections_per_lane: 1,
            acquire_timeout_ms: 30_000,
            settings: DbSettings::default(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: Storage::File(path.into()),
            ..Self::memory()
        }
    }

    /// Parse a path argument; `:memory:` selects an in-memory database.
    pub fn from_path(path: &str) -> Self {
        if path.trim() == MEMORY_PATH {
            Self::memory()
        } else {
            Self::file(path)
        }
    }

    pub fn with_max_connections_per_lane(mut self, max: u32) -> Self {
        self.max_connections_per_lane = max;
        self
    }

    pub fn with_acquire_timeout_ms(mut self, ms: u64) -> Self {
        self.acquire_timeout_ms = ms;
        self
    }

    pub fn with_busy_timeout_ms(mut self, ms: u64) -> Self {
        self.settings.busy_timeout_ms = ms;
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.settings.foreign_keys = enabled;
        self
    }

    pub fn kind(&self) -> DbKind {
        match self.storage {
            Storage::Memory => DbKind::SqliteMemory,
            Storage::File(_) => DbKind::SqliteFile,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.storage {
            Storage::Memory => None,
            Storage::File(path) => Some(path),
        }
    }

    /// Load from `SEALITE_DB_PATH`, `SEALITE_MAX_CONNS_PER_LANE`,
    /// `SEALITE_ACQUIRE_TIMEOUT_MS` and `SEALITE_BUSY_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, FacadeError> {
        let defaults = Self::memory();
        let path = std::env::var("SEALITE_DB_PATH").unwrap_or_else(|_| MEMORY_PATH.to_string());

        let config = Self::from_path(&path)
            .with_max_connections_per_lane(env_or(
                "SEALITE_MAX_CONNS_PER_LANE",
                defaults.max_connections_per_lane,
            )?)
            .with_acquire_timeout_ms(env_or(
                "SEALITE_ACQUIRE_TIMEOUT_MS",
                defaults.acquire_timeout_ms,
            )?)
            .with_busy_timeout_ms(env_or(
                "SEALITE_BUSY_TIMEOUT_MS",
                defaults.settings.busy_timeout_ms,
            )?);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FacadeError> {
        if self.max_connections_per_lane == 0 {
            return Err(FacadeError::config(
                "max_connections_per_lane must be at least 1",
            ));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(FacadeError::config("acquire_timeout_ms must be positive"));
        }
        if let Storage::File(path) = &self.storage {
            if path.as_os_str().is_empty() {
                return Err(FacadeError::config("SQLite file path must not be empty"));
            }
        }
        Ok(())
    }

    /// Connection spec for sqlx. Memory databases get a fresh shared-cache name
    /// on every call, so call once per registration.
    pub(crate) fn conn_spec(&self) -> String {
        match &self.storage {
            Storage::Memory => format!(
                "sqlite:file:sealite-{}?mode=memory&cache=shared",
                Uuid::new_v4().simple()
            ),
            Storage::File(path) => format!("sqlite://{}", path.display()),
        }
    }

    /// Path description for logging
    pub fn display_path(&self) -> String {
        match &self.storage {
            Storage::Memory => "sqlite::memory:".to_string(),
            Storage::File(path) => path.display().to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::memory()
    }
}

/// Ordered session-level statements run on every new connection.
/// File prerequisites (journal_mode, synchronous) are handled separately.
pub fn build_session_statements(settings: &DbSettings) -> Vec<String> {
    let foreign_keys = if settings.foreign_keys { "ON" } else { "OFF" };
    vec![
        format!("PRAGMA foreign_keys = {foreign_keys};"),
        format!("PRAGMA busy_timeout = {};", settings.busy_timeout_ms),
    ]
}

/// Database-level statements for file databases; must run before other connections exist.
pub fn file_prerequisite_statements() -> [&'static str; 2] {
    ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"]
}
