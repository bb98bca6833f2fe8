//! Repository for the `activity_logs` table.
//!
//! Append-only. Writes issued through [`ActivityLogRepo::record`] are
//! best-effort: a failed insert is logged and swallowed so it can never fail
//! the primary operation. Inserts issued inside an open transaction via
//! [`ActivityLogRepo::insert_tx`] commit or roll back with it.

use sqlx::PgPool;

use bms_core::types::DbId;

use crate::criteria::{bind_values, CriteriaBuilder};
use crate::error::{map_db_error, DbResult};
use crate::models::activity_log::{ActivityLog, ActivityLogFilter, CreateActivityLog};
use crate::pagination::ListParams;
use crate::PgTx;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, entity_type, entity_id, user_id, action, details, ip_address, created_at";

const INSERT: &str = "INSERT INTO activity_logs \
     (entity_type, entity_id, user_id, action, details, ip_address) \
     VALUES ($1, $2, $3, $4, $5, $6)";

/// Provides insert and query operations for the activity log.
pub struct ActivityLogRepo;

impl ActivityLogRepo {
    /// Insert a log entry, returning the created row.
    pub async fn insert(pool: &PgPool, entry: &CreateActivityLog) -> DbResult<ActivityLog> {
        let query = format!("{INSERT} RETURNING {COLUMNS}");
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(entry.user_id)
            .bind(&entry.action)
            .bind(&entry.details)
            .bind(&entry.ip_address)
            .fetch_one(pool)
            .await
            .map_err(map_db_error)
    }

    /// Insert a log entry within an open transaction. The entry commits or
    /// rolls back with the surrounding business writes.
    pub async fn insert_tx(tx: &mut PgTx, entry: &CreateActivityLog) -> DbResult<ActivityLog> {
        let query = format!("{INSERT} RETURNING {COLUMNS}");
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(entry.user_id)
            .bind(&entry.action)
            .bind(&entry.details)
            .bind(&entry.ip_address)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_db_error)
    }

    /// Best-effort insert: a failure is warned about and discarded, never
    /// surfaced to the caller.
    pub async fn record(pool: &PgPool, entry: &CreateActivityLog) -> Option<ActivityLog> {
        match Self::insert(pool, entry).await {
            Ok(log) => Some(log),
            Err(err) => {
                tracing::warn!(
                    entity_type = %entry.entity_type,
                    entity_id = entry.entity_id,
                    action = %entry.action,
                    error = %err,
                    "activity log write failed; continuing"
                );
                None
            }
        }
    }

    /// All entries for one entity, newest first.
    pub async fn find_by_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> DbResult<Vec<ActivityLog>> {
        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
            .map_err(map_db_error)
    }

    /// Query the log with filtering and pagination.
    pub async fn query(
        pool: &PgPool,
        filter: &ActivityLogFilter,
        params: &ListParams,
    ) -> DbResult<Vec<ActivityLog>> {
        let criteria = filter.build();
        let limit_idx = criteria.next_placeholder();
        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs {} \
             ORDER BY created_at DESC LIMIT ${limit_idx} OFFSET ${}",
            criteria.where_clause(),
            limit_idx + 1
        );
        let q = bind_values(sqlx::query_as::<_, ActivityLog>(&query), criteria.values());
        q.bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await
            .map_err(map_db_error)
    }

    /// Delete all entries written by a user. Part of the user hard-delete
    /// cascade; must run inside that transaction.
    pub(crate) async fn delete_by_user_tx(tx: &mut PgTx, user_id: DbId) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM activity_logs WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}
