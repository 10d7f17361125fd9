use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const IDX_TODOS_TITLE: &str = "idx_todos_title";

#[derive(Iden)]
enum Todos {
    Table,
    Title,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name(IDX_TODOS_TITLE)
                    .table(Todos::Table)
                    .col(Todos::Title)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_TODOS_TITLE)
                    .table(Todos::Table)
                    .to_owned(),
            )
            .await
    }
}
