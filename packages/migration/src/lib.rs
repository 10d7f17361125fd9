//! Schema and entities for the `todos` table.

pub use sea_orm;
pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20240101_000001_create_todos; // keep filename + module name in sync
mod m20240101_000002_add_todo_title_index;

pub use m20240101_000001_create_todos::Migration as CreateTodos;
pub use m20240101_000002_add_todo_title_index::Migration as AddTodoTitleIndex;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateTodos), Box::new(AddTodoTitleIndex)]
    }
}
