use migration::entities::{todos, Todos};
use migration::sea_orm::{ColumnTrait, DbBackend, QueryFilter, QueryOrder, Statement};
use sealite::QueryBuildable;
use test_support::{new_todo, todo_batch};

use crate::common::todo_facade;

#[tokio::test]
async fn test_fetch_with_filter() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;
    facade.save_batch(todo_batch("Todo", 5), 5).await?;
    facade.save(new_todo("needle", &["found"])).await?;

    let found = facade
        .fetch(facade.query::<Todos>().filter(todos::Column::Title.eq("needle")))
        .await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].some_list.0, vec!["found".to_string()]);

    let ordered = facade
        .fetch(
            facade
                .query::<Todos>()
                .filter(todos::Column::Title.starts_with("Todo"))
                .order_by_desc(todos::Column::Title),
        )
        .await?;
    let titles: Vec<&str> = ordered.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Todo #4", "Todo #3", "Todo #2", "Todo #1", "Todo #0"]);

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_fetch_one_without_match() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(1).await?;
    facade.save(new_todo("present", &[])).await?;

    let missing = facade
        .fetch_one(facade.query::<Todos>().filter(todos::Column::Title.eq("absent")))
        .await?;
    assert!(missing.is_none());

    let present = facade
        .fetch_one(facade.query::<Todos>().filter(todos::Column::Title.eq("present")))
        .await?;
    assert_eq!(present.map(|t| t.title), Some("present".to_string()));

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_count_matches_saved_rows() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(3).await?;
    assert_eq!(facade.count(facade.query::<Todos>()).await?, 0);

    facade.save_batch(todo_batch("counted", 17), 4).await?;
    assert_eq!(facade.count(facade.query::<Todos>()).await?, 17);
    assert_eq!(
        facade
            .count(facade.query::<Todos>().filter(todos::Column::Title.eq("counted #3")))
            .await?,
        1
    );

    facade.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_execute_raw_statement() -> Result<(), Box<dyn std::error::Error>> {
    let facade = todo_facade(2).await?;
    facade.save_batch(todo_batch("raw", 6), 3).await?;

    let removed = facade
        .execute(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "DELETE FROM todos WHERE title IN (?, ?)",
            ["raw #0".into(), "raw #5".into()],
        ))
        .await?;
    assert_eq!(removed, 2);
    assert_eq!(facade.count(facade.query::<Todos>()).await?, 4);

    facade.shutdown().await;
    Ok(())
}
