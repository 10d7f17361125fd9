use std::future::Future;

use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, IntoActiveModel};
use tracing::{debug, warn};

use super::Facade;
use crate::batch::{batched_for_each, BatchFailure, BatchSize};
use crate::error::FacadeError;

/// Model type produced by saving an active model.
pub type ModelOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Model;

impl Facade {
    /// Insert a new row and return the stored model.
    pub async fn save<A>(&self, model: A) -> Result<ModelOf<A>, FacadeError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        ModelOf<A>: IntoActiveModel<A> + Send + 'static,
    {
        self.run_bound("save", None, move |db| async move {
            Ok::<_, FacadeError>(model.insert(&db).await?)
        })
        .await
    }

    /// Update an existing row by primary key and return the stored model.
    pub async fn update<A>(&self, model: A) -> Result<ModelOf<A>, FacadeError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        ModelOf<A>: IntoActiveModel<A> + Send + 'static,
    {
        self.run_bound("update", None, move |db| async move {
            Ok::<_, FacadeError>(model.update(&db).await?)
        })
        .await
    }

    /// Delete a row by primary key; returns the number of rows removed.
    pub async fn delete<A>(&self, model: A) -> Result<u64, FacadeError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    {
        self.run_bound("delete", None, move |db| async move {
            Ok::<_, FacadeError>(model.delete(&db).await?.rows_affected)
        })
        .await
    }

    /// Every row of `E`, in storage order.
    pub async fn all<E>(&self) -> Result<Vec<E::Model>, FacadeError>
    where
        E: EntityTrait,
        E::Model: Send + 'static,
    {
        self.run_bound("all", None, |db| async move {
            Ok::<_, FacadeError>(E::find().all(&db).await?)
        })
        .await
    }

    pub async fn save_batch<A>(
        &self,
        models: Vec<A>,
        batch: impl Into<BatchSize>,
    ) -> Result<usize, FacadeError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        ModelOf<A>: IntoActiveModel<A> + Send + 'static,
    {
        self.run_batch("save_batch", models, batch, |model| async move {
            self.save(model).await.map(drop)
        })
        .await
    }

    pub async fn update_batch<A>(
        &self,
        models: Vec<A>,
        batch: impl Into<BatchSize>,
    ) -> Result<usize, FacadeError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        ModelOf<A>: IntoActiveModel<A> + Send + 'static,
    {
        self.run_batch("update_batch", models, batch, |model| async move {
            self.update(model).await.map(drop)
        })
        .await
    }

    pub async fn delete_batch<A>(
        &self,
        models: Vec<A>,
        batch: impl Into<BatchSize>,
    ) -> Result<usize, FacadeError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    {
        self.run_batch("delete_batch", models, batch, |model| async move {
            self.delete(model).await.map(drop)
        })
        .await
    }

    /// Delete every row of `E` that exists when the call starts.
    ///
    /// Rows inserted concurrently after the initial fetch are left in place.
    pub async fn delete_all<E>(&self, batch: impl Into<BatchSize>) -> Result<usize, FacadeError>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<E::ActiveModel> + Send + 'static,
        E::ActiveModel: Send + 'static,
    {
        let models: Vec<E::ActiveModel> = self
            .all::<E>()
            .await?
            .into_iter()
            .map(IntoActiveModel::into_active_model)
            .collect();
        self.delete_batch(models, batch).await
    }

    /// Items already applied when a failure occurs stay applied.
    async fn run_batch<T, F, Fut>(
        &self,
        op: &'static str,
        items: Vec<T>,
        batch: impl Into<BatchSize>,
        f: F,
    ) -> Result<usize, FacadeError>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), FacadeError>>,
    {
        let pool = self.resources()?.pool;
        let batch = batch.into();
        let total = items.len();

        pool.counters().batch_started();
        debug!(parent: &self.span, op = op, total = total, batch_size = batch.get(), "batch start");

        match batched_for_each(items, batch, f).await {
            Ok(done) => {
                debug!(parent: &self.span, op = op, done = done, "batch complete");
                Ok(done)
            }
            Err(BatchFailure { succeeded, error }) => {
                pool.counters().batch_failed();
                warn!(
                    parent: &self.span,
                    op = op,
                    succeeded = succeeded,
                    total = total,
                    error = %error,
                    "batch stopped after failure"
                );
                Err(FacadeError::BatchPartialFailure {
                    succeeded,
                    total,
                    source: Box::new(error),
                })
            }
        }
    }
}
