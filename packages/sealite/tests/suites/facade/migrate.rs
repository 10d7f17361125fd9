use migration::entities::Todos;
use migration::{CreateTodos, Migrator, MigratorTrait};
use sealite::{DatabaseConfig, Facade, FacadeConfig, FacadeError, MigrationCommand};
use test_support::{new_todo, unique_db_path, unique_str};

use crate::common::{stored_titles, todo_facade};

async fn bare_facade() -> Result<Facade, FacadeError> {
    Facade::builder()
        .threads(2)
        .label(unique_str("migrate"))
        .start()
        .await
}

#[tokio::test]
async fn test_prepare_twice_reports_migration_failure() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;

    let err = facade.prepare(CreateTodos).await.unwrap_err();
    assert!(matches!(err, FacadeError::MigrationFailed(_)));
    assert!(err.db_err().is_some());

    // the table is untouched and still usable
    facade.save(new_todo("still here", &[])).await?;
    assert_eq!(stored_titles(&facade).await?, vec!["still here"]);

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_revert_then_prepare_recreates_the_table() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;
    facade.save(new_todo("doomed", &[])).await?;

    facade.revert(CreateTodos).await?;
    assert_eq!(
        facade.all::<Todos>().await.unwrap_err().code(),
        "OPERATION_FAILED"
    );

    facade.prepare(CreateTodos).await?;
    assert!(facade.all::<Todos>().await?.is_empty());

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_status_before_any_migration() -> Result<(), Box<dyn std::error::Error>> {
    let facade = bare_facade().await?;

    let status = facade.migration_status::<Migrator>().await?;
    assert_eq!(status.backend, "Sqlite");
    assert_eq!(status.defined, Migrator::migrations().len());
    assert_eq!(status.applied, 0);
    assert_eq!(status.latest, None);
    assert!(!status.is_current());

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_migrator_commands_move_the_schema() -> Result<(), Box<dyn std::error::Error>> {
    let facade = bare_facade().await?;

    facade.migrate::<Migrator>(MigrationCommand::Up).await?;
    let status = facade.migration_status::<Migrator>().await?;
    assert_eq!(status.applied, 2);
    assert!(status.is_current());
    assert_eq!(
        status.latest.as_deref(),
        Some("m20240101_000002_add_todo_title_index")
    );
    facade.save(new_todo("migrated", &[])).await?;

    facade.migrate::<Migrator>(MigrationCommand::Status).await?;

    facade.migrate::<Migrator>(MigrationCommand::Down).await?;
    let status = facade.migration_status::<Migrator>().await?;
    assert!(status.applied < status.defined);

    facade.migrate::<Migrator>(MigrationCommand::Fresh).await?;
    assert!(facade.migration_status::<Migrator>().await?.is_current());
    assert!(facade.all::<Todos>().await?.is_empty());

    facade.migrate::<Migrator>(MigrationCommand::Refresh).await?;
    assert!(facade.migration_status::<Migrator>().await?.is_current());

    facade.migrate::<Migrator>(MigrationCommand::Reset).await?;
    assert_eq!(facade.migration_status::<Migrator>().await?.applied, 0);

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_file_database_survives_restart() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = unique_db_path(dir.path());
    let config = FacadeConfig::new(DatabaseConfig::file(&path)).with_threads(2);

    let first = Facade::new(config.clone()).await?;
    first.migrate::<Migrator>(MigrationCommand::Up).await?;
    first.save(new_todo("persisted", &["disk"])).await?;
    first.shutdown().await;
    assert!(path.exists());

    let second = Facade::new(config).await?;
    let status = second.migration_status::<Migrator>().await?;
    assert!(status.is_current());
    assert!(status.database.ends_with(".db"));
    assert_eq!(stored_titles(&second).await?, vec!["persisted"]);
    second.shutdown().await;
    Ok(())
}
