use migration::entities::Todos;
use migration::sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement};
use migration::CreateTodos;
use sealite::{DatabaseConfig, DatabaseId, Facade, FacadeConfig, FacadeError};
use test_support::{new_todo, todo_batch};

use crate::common::{stored_titles, todo_facade};

async fn table_exists(db: &DatabaseConnection, table: &str) -> Result<bool, DbErr> {
    let row = db
        .query_one(Statement::from_sql_and_values(
            db.get_database_backend(),
            "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table.into()],
        ))
        .await?;
    Ok(match row {
        Some(row) => row.try_get::<i64>("", "n")? > 0,
        None => false,
    })
}

#[tokio::test]
async fn test_default_and_custom_handles_do_not_share_data(
) -> Result<(), Box<dyn std::error::Error>> {
    let default = Facade::memory().await?;
    let custom = Facade::new(
        FacadeConfig::new(DatabaseConfig::memory().with_max_connections_per_lane(30))
            .with_threads(30)
            .with_label("Custom.SEALITE"),
    )
    .await?;
    default.prepare(CreateTodos).await?;
    custom.prepare(CreateTodos).await?;

    default.save(new_todo("default only", &[])).await?;
    custom.save_batch(todo_batch("custom", 60), 30).await?;

    assert_eq!(stored_titles(&default).await?, vec!["default only"]);
    assert_eq!(custom.all::<Todos>().await?.len(), 60);
    assert!(stored_titles(&custom)
        .await?
        .iter()
        .all(|title| title.starts_with("custom #")));

    default.shutdown().await;
    assert_eq!(custom.all::<Todos>().await?.len(), 60);
    custom.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_named_database_is_separate_from_default() -> Result<(), Box<dyn std::error::Error>> {
    let facade = Facade::builder()
        .threads(2)
        .register("audit", DatabaseConfig::memory())
        .start()
        .await?;
    facade.prepare(CreateTodos).await?;

    let audit = DatabaseId::from("audit");
    let mut ids = facade.databases();
    ids.sort();
    assert_eq!(ids, vec![audit.clone(), DatabaseId::default()]);

    let audit_has_todos = facade
        .with_connection_on(&audit, |db| {
            Box::pin(async move { Ok::<_, FacadeError>(table_exists(db, "todos").await?) })
        })
        .await?;
    assert!(!audit_has_todos);

    let default_has_todos = facade
        .with_connection(|db| {
            Box::pin(async move { Ok::<_, FacadeError>(table_exists(db, "todos").await?) })
        })
        .await?;
    assert!(default_has_todos);

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_register_database_after_start() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;

    facade
        .register_database("reports", DatabaseConfig::memory())
        .await?;
    let err = facade
        .register_database("reports", DatabaseConfig::memory())
        .await
        .unwrap_err();
    assert!(matches!(err, FacadeError::Config { .. }));

    let reports = DatabaseId::from("reports");
    facade
        .with_connection_on(&reports, |db| {
            Box::pin(async move {
                db.execute(Statement::from_string(
                    db.get_database_backend(),
                    "CREATE TABLE report (id INTEGER PRIMARY KEY)".to_string(),
                ))
                .await?;
                Ok::<_, FacadeError>(())
            })
        })
        .await?;

    // every lane of the named database sees the table
    for _ in 0..facade.lane_count() {
        let seen = facade
            .with_connection_on(&reports, |db| {
                Box::pin(async move { Ok::<_, FacadeError>(table_exists(db, "report").await?) })
            })
            .await?;
        assert!(seen);
    }

    facade.shutdown().await;
    Ok(())
}
