use async_trait::async_trait;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select, Statement};

use super::Facade;
use crate::error::FacadeError;

/// Query-builder access to a database handle.
///
/// Queries are built with SeaORM's [`Select`] and executed through the
/// handle, so they run on the handle's pool like every other operation.
#[async_trait]
pub trait QueryBuildable {
    /// Start a query over every row of `E`.
    fn query<E: EntityTrait>(&self) -> Select<E> {
        E::find()
    }

    async fn fetch<E>(&self, select: Select<E>) -> Result<Vec<E::Model>, FacadeError>
    where
        E: EntityTrait,
        E::Model: Send + 'static;

    async fn fetch_one<E>(&self, select: Select<E>) -> Result<Option<E::Model>, FacadeError>
    where
        E: EntityTrait,
        E::Model: Send + 'static;

    async fn count<E>(&self, select: Select<E>) -> Result<u64, FacadeError>
    where
        E: EntityTrait,
        E::Model: Send + Sync + 'static;

    /// Execute a raw statement; returns rows affected.
    async fn execute(&self, statement: Statement) -> Result<u64, FacadeError>;
}

#[async_trait]
impl QueryBuildable for Facade {
    async fn fetch<E>(&self, select: Select<E>) -> Result<Vec<E::Model>, FacadeError>
    where
        E: EntityTrait,
        E::Model: Send + 'static,
    {
        self.run_bound("fetch", None, move |db| async move {
            Ok::<_, FacadeError>(select.all(&db).await?)
        })
        .await
    }

    async fn fetch_one<E>(&self, select: Select<E>) -> Result<Option<E::Model>, FacadeError>
    where
        E: EntityTrait,
        E::Model: Send + 'static,
    {
        self.run_bound("fetch_one", None, move |db| async move {
            Ok::<_, FacadeError>(select.one(&db).await?)
        })
        .await
    }

    async fn count<E>(&self, select: Select<E>) -> Result<u64, FacadeError>
    where
        E: EntityTrait,
        E::Model: Send + Sync + 'static,
    {
        self.run_bound("count", None, move |db| async move {
            Ok::<_, FacadeError>(select.count(&db).await?)
        })
        .await
    }

    async fn execute(&self, statement: Statement) -> Result<u64, FacadeError> {
        self.run_bound("execute", None, move |db| async move {
            Ok::<_, FacadeError>(db.execute(statement).await?.rows_affected())
        })
        .await
    }
}
