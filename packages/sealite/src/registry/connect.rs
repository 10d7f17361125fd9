use std::str::FromStr;
use std::time::Duration;

use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Connection};
use tracing::{info, trace};

use crate::config::db::{build_session_statements, file_prerequisite_statements};
use crate::config::{DatabaseConfig, DbSettings, Storage};
use crate::error::FacadeError;

/// Open one connection pool per execution lane for `config`.
///
/// Memory databases are named once here, so every lane of this registration
/// sees the same data and no other registration can.
pub(crate) async fn connect_lanes(
    config: &DatabaseConfig,
    lanes: usize,
) -> Result<Vec<DatabaseConnection>, FacadeError> {
    let spec = config.conn_spec();
    let options = connect_options(config, &spec)?;

    // journal_mode is stored in the file and needs exclusive access
    if let Storage::File(_) = config.storage {
        apply_file_prerequisites(&options).await?;
    }

    let mut connections = Vec::with_capacity(lanes);
    for lane in 0..lanes {
        let pool = build_lane_pool(config, options.clone()).await?;
        trace!(lane = lane, "db=sqlite lane_pool=ready");
        connections.push(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool));
    }

    info!(
        "pool=create engine=sqlite path={} lanes={} max_per_lane={} acquire_timeout_ms={}",
        config.display_path(),
        lanes,
        config.max_connections_per_lane,
        config.acquire_timeout_ms
    );
    Ok(connections)
}

fn connect_options(config: &DatabaseConfig, spec: &str) -> Result<SqliteConnectOptions, FacadeError> {
    match &config.storage {
        Storage::Memory => SqliteConnectOptions::from_str(spec)
            .map_err(|e| FacadeError::connect("invalid SQLite connection options", e)),
        Storage::File(path) => Ok(SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)),
    }
}

async fn apply_file_prerequisites(options: &SqliteConnectOptions) -> Result<(), FacadeError> {
    let mut conn = options
        .connect()
        .await
        .map_err(|e| FacadeError::connect("failed to open SQLite file", e))?;
    for stmt in file_prerequisite_statements() {
        sqlx::query(stmt)
            .execute(&mut conn)
            .await
            .map_err(|e| FacadeError::connect("failed to apply SQLite file settings", e))?;
    }
    conn.close()
        .await
        .map_err(|e| FacadeError::connect("failed to close SQLite setup connection", e))?;
    trace!("db=sqlite file_prerequisites=applied");
    Ok(())
}

async fn apply_session_settings(
    conn: &mut sqlx::SqliteConnection,
    settings: &DbSettings,
) -> Result<(), sqlx::Error> {
    for stmt in build_session_statements(settings) {
        sqlx::query(&stmt).execute(&mut *conn).await?;
    }
    Ok(())
}

async fn build_lane_pool(
    config: &DatabaseConfig,
    options: SqliteConnectOptions,
) -> Result<SqlitePool, FacadeError> {
    let settings = config.settings.clone();
    let mut pool_opts = SqlitePoolOptions::new()
        .max_connections(config.max_connections_per_lane)
        .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms));

    // An in-memory database disappears with its last connection.
    if let Storage::Memory = config.storage {
        pool_opts = pool_opts
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_opts
        .after_connect(move |conn, _meta| {
            let settings = settings.clone();
            Box::pin(async move {
                apply_session_settings(conn, &settings).await?;
                trace!("db=sqlite hook=after_connect ok");
                Ok::<_, sqlx::Error>(())
            })
        })
        .connect_with(options)
        .await
        .map_err(|e| FacadeError::connect("failed to create SQLite connection pool", e))?;

    // warm-up so the hook has run before the first real operation
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| FacadeError::connect("connection acquisition failed during warmup", e))?;
    sqlx::query("SELECT 1;")
        .execute(&mut *conn)
        .await
        .map_err(|e| FacadeError::connect("warmup query failed", e))?;
    drop(conn);

    Ok(pool)
}
