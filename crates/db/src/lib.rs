//! Data-access layer: connection pool, transaction scoping, the generic
//! repository contract, and the per-entity repositories.
//!
//! All writes go through a [`DbPool`]; multi-row invariants (the request
//! conversion saga, the user hard-delete cascade) run inside a single
//! [`with_transaction`] scope. Activity logging is a best-effort side
//! channel and never part of an operation's failure path unless it is
//! issued inside an already-open transaction.

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;

use crate::error::{map_db_error, DbResult};
use bms_core::error::CoreError;

pub mod criteria;
pub mod error;
pub mod models;
pub mod pagination;
pub mod repositories;
pub mod repository;

pub type DbPool = sqlx::PgPool;

/// Transaction handle shared by all repository calls inside one atomic scope.
pub type PgTx = sqlx::Transaction<'static, sqlx::Postgres>;

/// Upper bound on acquiring a connection from the pool.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a whole transaction scope (acquire + callback + commit).
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Cheap liveness probe used by embedding applications.
pub async fn health_check(pool: &DbPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

/// Run `callback` inside a single transaction.
///
/// Commits on `Ok`, rolls back on `Err` and re-raises the already-mapped
/// domain error. The whole scope is bounded by [`TRANSACTION_TIMEOUT`];
/// exceeding it surfaces as a `Database` error. There is no automatic retry
/// for transient failures.
pub async fn with_transaction<T, F>(pool: &DbPool, callback: F) -> DbResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut PgTx) -> BoxFuture<'t, DbResult<T>> + Send,
{
    let scope = async {
        let mut tx = pool.begin().await.map_err(map_db_error)?;
        match callback(&mut tx).await {
            Ok(value) => {
                tx.commit().await.map_err(map_db_error)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed after transaction error");
                }
                Err(err)
            }
        }
    };

    match tokio::time::timeout(TRANSACTION_TIMEOUT, scope).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::database(None, "transaction timed out")),
    }
}
