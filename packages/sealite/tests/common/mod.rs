#![allow(dead_code)]

// tests/common/mod.rs
use migration::entities::{Todo, Todos};
use migration::CreateTodos;
use sealite::{Facade, FacadeError};
use test_support::unique_str;

// Logging is auto-installed for every test binary
#[ctor::ctor]
fn init_logging() {
    test_support::logging::init();
}

/// In-memory handle with `threads` lanes and the `todos` table created.
pub async fn todo_facade(threads: usize) -> Result<Facade, FacadeError> {
    let facade = Facade::builder()
        .threads(threads)
        .label(unique_str("test"))
        .start()
        .await?;
    facade.prepare(CreateTodos).await?;
    Ok(facade)
}

/// Sorted titles of every stored todo.
pub async fn stored_titles(facade: &Facade) -> Result<Vec<String>, FacadeError> {
    let mut titles: Vec<String> = facade
        .all::<Todos>()
        .await?
        .into_iter()
        .map(|t: Todo| t.title)
        .collect();
    titles.sort();
    Ok(titles)
}
