use std::fmt;
use std::str::FromStr;

use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::{MigrationTrait, MigratorTrait, SchemaManager};
use tracing::{error, info};

use super::Facade;
use crate::error::FacadeError;

/// Migrator commands understood by [`Facade::migrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationCommand {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

impl MigrationCommand {
    fn changes_schema(self) -> bool {
        !matches!(self, MigrationCommand::Status)
    }
}

impl fmt::Display for MigrationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationCommand::Up => "up",
            MigrationCommand::Down => "down",
            MigrationCommand::Fresh => "fresh",
            MigrationCommand::Reset => "reset",
            MigrationCommand::Refresh => "refresh",
            MigrationCommand::Status => "status",
        };
        f.write_str(name)
    }
}

impl FromStr for MigrationCommand {
    type Err = FacadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(MigrationCommand::Up),
            "down" => Ok(MigrationCommand::Down),
            "fresh" => Ok(MigrationCommand::Fresh),
            "reset" => Ok(MigrationCommand::Reset),
            "refresh" => Ok(MigrationCommand::Refresh),
            "status" => Ok(MigrationCommand::Status),
            other => Err(FacadeError::config(format!(
                "unknown migration command `{other}`; use up | down | fresh | reset | refresh | status"
            ))),
        }
    }
}

/// Schema state as seen by a migrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub backend: String,
    /// Database file, or `:memory:`
    pub database: String,
    pub defined: usize,
    pub applied: usize,
    /// Name of the most recently applied migration
    pub latest: Option<String>,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.applied == self.defined
    }
}

impl Facade {
    /// Apply a single migration's `up` step.
    ///
    /// Nothing guards against applying it twice; the schema error from the
    /// second attempt is returned as [`FacadeError::MigrationFailed`].
    pub async fn prepare<M>(&self, migration: M) -> Result<(), FacadeError>
    where
        M: MigrationTrait + 'static,
    {
        self.run_bound("prepare", None, move |db| async move {
            let manager = SchemaManager::new(&db);
            migration
                .up(&manager)
                .await
                .map_err(FacadeError::MigrationFailed)
        })
        .await
    }

    /// Apply a single migration's `down` step.
    pub async fn revert<M>(&self, migration: M) -> Result<(), FacadeError>
    where
        M: MigrationTrait + 'static,
    {
        self.run_bound("revert", None, move |db| async move {
            let manager = SchemaManager::new(&db);
            migration
                .down(&manager)
                .await
                .map_err(FacadeError::MigrationFailed)
        })
        .await
    }

    /// Run a migrator command against the default database.
    pub async fn migrate<M>(&self, command: MigrationCommand) -> Result<(), FacadeError>
    where
        M: MigratorTrait + 'static,
    {
        self.run_bound("migrate", None, move |db| async move {
            run_command::<M>(&db, command)
                .await
                .map_err(FacadeError::MigrationFailed)
        })
        .await
    }

    pub async fn migration_status<M>(&self) -> Result<MigrationStatus, FacadeError>
    where
        M: MigratorTrait + 'static,
    {
        self.run_bound("migration_status", None, move |db| async move {
            status::<M>(&db).await.map_err(FacadeError::MigrationFailed)
        })
        .await
    }
}

async fn run_command<M: MigratorTrait>(
    db: &DatabaseConnection,
    command: MigrationCommand,
) -> Result<(), DbErr> {
    let before = status::<M>(db).await?;

    info!("▶ cmd={command} backend={} database={}", before.backend, before.database);
    info!(
        "▶ BEFORE: runner has {} migration(s) defined, {} applied",
        before.defined, before.applied
    );

    let result = match command {
        MigrationCommand::Up => M::up(db, None).await,
        MigrationCommand::Down => M::down(db, None).await,
        MigrationCommand::Fresh => M::fresh(db).await,
        MigrationCommand::Reset => M::reset(db).await,
        MigrationCommand::Refresh => M::refresh(db).await,
        MigrationCommand::Status => M::status(db).await,
    };

    match result {
        Ok(()) => {
            if command.changes_schema() {
                let after = status::<M>(db).await?;
                info!(
                    "▶ AFTER: runner has {} migration(s) defined, {} applied",
                    after.defined, after.applied
                );
            }
            info!("✅ {command} OK for {}", before.backend);
            Ok(())
        }
        Err(e) => {
            error!("❌ {command} failed for {}: {e}", before.backend);
            Err(e)
        }
    }
}

async fn status<M: MigratorTrait>(db: &DatabaseConnection) -> Result<MigrationStatus, DbErr> {
    let backend = format!("{:?}", db.get_database_backend());
    let database = database_name(db).await?;

    // the migrations table does not exist before the first `up`
    let (applied, latest) = match M::get_applied_migrations(db).await {
        Ok(migrations) => (
            migrations.len(),
            migrations.last().map(|m| m.name().to_string()),
        ),
        Err(DbErr::Exec(_)) => (0, None),
        Err(e) => return Err(e),
    };

    Ok(MigrationStatus {
        backend,
        database,
        defined: M::migrations().len(),
        applied,
        latest,
    })
}

async fn database_name(db: &DatabaseConnection) -> Result<String, DbErr> {
    if db.get_database_backend() != DatabaseBackend::Sqlite {
        return Ok("<unsupported>".to_string());
    }

    let stmt = Statement::from_string(
        DatabaseBackend::Sqlite,
        String::from("SELECT file FROM pragma_database_list WHERE name = 'main'"),
    );
    let name = match db.query_one(stmt).await? {
        Some(row) => match row.try_get::<String>("", "file") {
            Ok(file) if file.is_empty() => ":memory:".to_string(),
            Ok(file) => file,
            Err(_) => "<unknown>".to_string(),
        },
        None => "<unknown>".to_string(),
    };
    Ok(name)
}
