use std::future::Future;
use std::pin::Pin;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::warn;

use super::Facade;
use crate::error::FacadeError;
use crate::registry::DatabaseId;

/// Future returned by a scoped closure, borrowing the connection it was given.
pub type ScopedFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

impl Facade {
    /// Run `f` with one connection of the default database.
    ///
    /// Everything `f` does stays on a single lane; the binding is released
    /// when `f` finishes, whatever the outcome.
    pub async fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseConnection) -> ScopedFuture<'c, T, E> + Send + 'static,
        T: Send + 'static,
        E: From<FacadeError> + Send + 'static,
    {
        self.scoped_connection("with_connection", None, f).await
    }

    /// Like [`Facade::with_connection`] for a named database.
    pub async fn with_connection_on<T, E, F>(&self, id: &DatabaseId, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseConnection) -> ScopedFuture<'c, T, E> + Send + 'static,
        T: Send + 'static,
        E: From<FacadeError> + Send + 'static,
    {
        self.scoped_connection("with_connection", Some(id), f).await
    }

    /// Run `f` inside a transaction on the default database.
    ///
    /// Commits when `f` returns `Ok` and rolls back when it returns `Err`.
    /// A rollback failure is logged and the closure's error is returned.
    pub async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> ScopedFuture<'c, T, E> + Send + 'static,
        T: Send + 'static,
        E: From<FacadeError> + Send + 'static,
    {
        self.run_bound("transaction", None, move |db| async move {
            let txn = db.begin().await.map_err(FacadeError::from)?;

            let out = f(&txn).await;

            match out {
                Ok(value) => {
                    txn.commit().await.map_err(FacadeError::from)?;
                    Ok::<T, E>(value)
                }
                Err(err) => {
                    if let Err(rollback) = txn.rollback().await {
                        warn!(error = %rollback, "rollback failed after transaction error");
                    }
                    Err(err)
                }
            }
        })
        .await
    }

    async fn scoped_connection<T, E, F>(
        &self,
        op: &'static str,
        id: Option<&DatabaseId>,
        f: F,
    ) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c DatabaseConnection) -> ScopedFuture<'c, T, E> + Send + 'static,
        T: Send + 'static,
        E: From<FacadeError> + Send + 'static,
    {
        self.run_bound(op, id, move |db| async move { f(&db).await })
            .await
    }
}
