use std::sync::Arc;
use std::time::Duration;

use migration::entities::Todos;
use migration::CreateTodos;
use sealite::{DatabaseConfig, Facade, FacadeConfig, FacadeError, LifecycleState};
use test_support::{new_todo, todo_batch};

use crate::common::todo_facade;

#[tokio::test]
async fn test_shutdown_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;
    facade.save(new_todo("before shutdown", &[])).await?;

    facade.shutdown().await;
    assert_eq!(facade.state(), LifecycleState::Closed);
    facade.shutdown().await;
    assert_eq!(facade.state(), LifecycleState::Closed);
    assert!(!facade.is_active());

    Ok(())
}

#[tokio::test]
async fn test_cancelled_shutdown_still_closes() -> Result<(), Box<dyn std::error::Error>> {
    let facade = Arc::new(todo_facade(2).await?);

    let busy = Arc::clone(&facade);
    let slow = tokio::spawn(async move {
        busy.with_connection(|_db| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok::<(), FacadeError>(())
            })
        })
        .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // drain waits for the slow scope, so the caller gives up first
    let cancelled = tokio::time::timeout(Duration::from_millis(20), facade.shutdown()).await;
    assert!(cancelled.is_err());
    assert_eq!(facade.state(), LifecycleState::Closed);

    facade.shutdown().await;
    assert_eq!(facade.state(), LifecycleState::Closed);
    assert!(facade.all::<Todos>().await.unwrap_err().is_pool_closed());

    match slow.await? {
        Ok(()) => {}
        Err(e) => assert!(e.is_pool_closed(), "unexpected error: {e}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_every_operation_fails_after_shutdown() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;
    facade.shutdown().await;

    let err = facade.save(new_todo("late", &[])).await.unwrap_err();
    assert!(matches!(err, FacadeError::PoolClosed));
    assert_eq!(err.code(), "POOL_CLOSED");

    assert!(facade.all::<Todos>().await.unwrap_err().is_pool_closed());
    assert!(facade
        .save_batch(todo_batch("late", 3), 2)
        .await
        .unwrap_err()
        .is_pool_closed());
    assert!(facade.prepare(CreateTodos).await.unwrap_err().is_pool_closed());
    assert!(facade
        .register_database("late", DatabaseConfig::memory())
        .await
        .unwrap_err()
        .is_pool_closed());

    let scoped: Result<(), FacadeError> = facade
        .with_connection(|_db| Box::pin(async { Ok::<(), FacadeError>(()) }))
        .await;
    assert!(scoped.unwrap_err().is_pool_closed());

    assert!(facade.databases().is_empty());
    Ok(())
}

#[test]
fn test_drop_outside_async_context_stops_the_pool() -> Result<(), Box<dyn std::error::Error>> {
    let caller = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let facade = caller.block_on(async {
        let facade = todo_facade(3).await?;
        facade.save_batch(todo_batch("sync", 10), 4).await?;
        Ok::<_, FacadeError>(facade)
    })?;
    assert!(facade.is_active());

    // no runtime is current here, so the pool is stopped synchronously
    drop(facade);
    drop(caller);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_racing_a_batch_never_corrupts_results(
) -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(4).await?;

    let (saved, ()) = tokio::join!(
        facade.save_batch(todo_batch("race", 200), 10),
        facade.shutdown()
    );

    match saved {
        Ok(count) => assert_eq!(count, 200),
        Err(e) => assert!(e.is_pool_closed(), "unexpected error: {e}"),
    }
    assert_eq!(facade.state(), LifecycleState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_custom_facade_with_many_lanes() -> Result<(), Box<dyn std::error::Error>> {
    let config = FacadeConfig::new(DatabaseConfig::memory().with_max_connections_per_lane(30))
        .with_threads(30)
        .with_label("Custom.SEALITE");
    let facade = Facade::new(config).await?;
    assert_eq!(facade.label(), "Custom.SEALITE");
    assert_eq!(facade.lane_count(), 30);

    facade.prepare(CreateTodos).await?;
    facade.save_batch(todo_batch("Todo", 120), 30).await?;
    assert_eq!(facade.all::<Todos>().await?.len(), 120);

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_stats_track_admissions_and_failures() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;
    let baseline = facade.stats().unwrap_or_default();

    let saved = facade.save(new_todo("counted", &[])).await?;
    let _ = facade
        .save(migration::entities::todos::ActiveModel {
            id: migration::sea_orm::Set(saved.id),
            ..new_todo("duplicate", &[])
        })
        .await
        .unwrap_err();
    facade.save_batch(todo_batch("counted", 4), 2).await?;

    let stats = facade.stats().unwrap_or_default();
    assert_eq!(stats.admitted_total - baseline.admitted_total, 6);
    assert_eq!(stats.failed_total - baseline.failed_total, 1);
    assert_eq!(stats.batches_total - baseline.batches_total, 1);
    assert_eq!(stats.batch_failures_total, 0);

    facade.shutdown().await;
    assert!(facade.stats().is_none());
    Ok(())
}

#[tokio::test]
async fn test_memory_constructor_starts_empty() -> Result<(), Box<dyn std::error::Error>> {
    let facade = Facade::memory().await?;
    assert_eq!(facade.label(), "sealite.memory");
    assert_eq!(facade.default_database().as_str(), "sqlite");
    assert_eq!(facade.databases(), vec![facade.default_database().clone()]);

    facade.shutdown().await;
    Ok(())
}
