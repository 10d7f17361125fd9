use migration::entities::todos;
use migration::entities::{TagList, Todos};
use migration::sea_orm::{IntoActiveModel, Set};
use sealite::FacadeError;
use test_support::new_todo;

use crate::common::{stored_titles, todo_facade};

#[tokio::test]
async fn test_save_then_all_returns_the_item() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;

    let saved = facade.save(new_todo("Hello World", &["hello", "world"])).await?;
    assert_eq!(saved.title, "Hello World");
    assert_eq!(saved.some_list, TagList(vec!["hello".into(), "world".into()]));

    let values = facade.all::<Todos>().await?;
    assert_eq!(values, vec![saved]);

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_update_replaces_fields() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;
    let saved = facade.save(new_todo("draft", &[])).await?;

    let mut changed = saved.clone().into_active_model();
    changed.title = Set("final".to_string());
    let updated = facade.update(changed).await?;

    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.title, "final");
    assert_eq!(stored_titles(&facade).await?, vec!["final"]);

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_delete_reports_rows_affected() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;
    let saved = facade.save(new_todo("short lived", &[])).await?;

    assert_eq!(facade.delete(saved.clone().into_active_model()).await?, 1);
    assert_eq!(facade.delete(saved.into_active_model()).await?, 0);
    assert!(facade.all::<Todos>().await?.is_empty());

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_duplicate_primary_key_is_an_operation_failure() -> Result<(), Box<dyn std::error::Error>>
{
    let facade = todo_facade(1).await?;
    let saved = facade.save(new_todo("original", &[])).await?;

    let clash = todos::ActiveModel {
        id: Set(saved.id),
        title: Set("clash".to_string()),
        some_list: Set(TagList::default()),
    };
    let err = facade.save(clash).await.unwrap_err();

    assert!(matches!(err, FacadeError::OperationFailed(_)));
    assert!(err.db_err().is_some());
    assert_eq!(stored_titles(&facade).await?, vec!["original"]);

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_update_of_missing_row_fails() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(1).await?;
    let saved = facade.save(new_todo("gone", &[])).await?;
    facade.delete(saved.clone().into_active_model()).await?;

    let mut stale = saved.into_active_model();
    stale.title = Set("resurrected".to_string());
    let err = facade.update(stale).await.unwrap_err();

    assert_eq!(err.code(), "OPERATION_FAILED");
    assert!(facade.all::<Todos>().await?.is_empty());

    facade.shutdown().await;
    Ok(())
}
