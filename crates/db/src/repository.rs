//! Generic repository contract.
//!
//! The entity-agnostic CRUD operations are default method bodies over
//! Postgres: a concrete repository supplies its table name, column list,
//! sort allowlist, and filter type, and inherits find/delete/count. The
//! write operations (`create`, `update`, `bulk_update`) touch entity-specific
//! columns and must be implemented per repository.
//!
//! Lookups return `Ok(None)` / empty collections for absent rows; only
//! `update` treats absence as an error, because the caller asked to mutate a
//! specific row.

use async_trait::async_trait;
use bms_core::error::CoreError;
use bms_core::types::DbId;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use std::time::Instant;

use crate::criteria::{bind_values, bind_values_scalar, Criteria, CriteriaBuilder};
use crate::error::{map_db_error, DbResult};
use crate::pagination::{ListParams, Page, SortDir};

/// Queries slower than this are logged with `tracing::warn`.
const SLOW_QUERY_MS: u128 = 250;

fn warn_if_slow(table: &'static str, operation: &'static str, started: Instant) {
    let elapsed_ms = started.elapsed().as_millis();
    if elapsed_ms > SLOW_QUERY_MS {
        tracing::warn!(
            table,
            operation,
            elapsed_ms = elapsed_ms as u64,
            "slow query"
        );
    }
}

#[async_trait]
pub trait Repository {
    type Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin;
    type Create: Sync;
    type Update: Sync;
    type Filter: CriteriaBuilder + Sync;

    const TABLE: &'static str;
    /// Entity name used in error messages.
    const ENTITY: &'static str;
    /// Column list shared across queries to avoid repetition.
    const COLUMNS: &'static str;
    /// Columns accepted for `ListParams::sort_by`.
    const SORT_COLUMNS: &'static [&'static str];
    /// Order applied when no explicit sort is requested.
    const DEFAULT_ORDER: &'static str;

    /// Predicate applied to list and count queries when no filter is given
    /// (soft-delete exclusion). `find_by_id` deliberately bypasses it: a
    /// soft-deleted row stays directly addressable.
    fn base_predicate() -> Option<&'static str> {
        None
    }

    /// Insert a new row, returning it. Timestamps default in the schema.
    async fn create(pool: &PgPool, input: &Self::Create) -> DbResult<Self::Entity>;

    /// Patch a row; only non-`None` fields are applied and `updated_at` is
    /// stamped. An absent row is a `NotFound` error.
    async fn update(pool: &PgPool, id: DbId, input: &Self::Update) -> DbResult<Self::Entity>;

    /// Apply the same patch to every row in `ids`, returning the number of
    /// rows affected. Every field of the update DTO is honored, exactly as
    /// in the single-row `update`. An empty id list is a no-op returning 0.
    async fn bulk_update(pool: &PgPool, ids: &[DbId], input: &Self::Update) -> DbResult<u64>;

    /// Resolve the ORDER BY fragment for `params`, validating `sort_by`
    /// against the allowlist so caller input never reaches query text.
    fn order_clause(params: &ListParams) -> DbResult<String> {
        match &params.sort_by {
            None => Ok(Self::DEFAULT_ORDER.to_string()),
            Some(column) => {
                if !Self::SORT_COLUMNS.contains(&column.as_str()) {
                    return Err(CoreError::validation(format!(
                        "cannot sort {} by '{column}'; allowed: {}",
                        Self::TABLE,
                        Self::SORT_COLUMNS.join(", ")
                    )));
                }
                let dir = params.sort_dir.unwrap_or(SortDir::Asc).as_sql();
                Ok(format!("{column} {dir}"))
            }
        }
    }

    /// Paginated listing. A page past the end returns an empty data array
    /// with the envelope intact.
    async fn find_all(pool: &PgPool, params: &ListParams) -> DbResult<Page<Self::Entity>> {
        let order = Self::order_clause(params)?;
        let where_clause = match Self::base_predicate() {
            Some(predicate) => format!("WHERE {predicate}"),
            None => String::new(),
        };

        let started = Instant::now();

        let count_query = format!("SELECT COUNT(*) FROM {} {where_clause}", Self::TABLE);
        let total: i64 = sqlx::query_scalar(&count_query)
            .fetch_one(pool)
            .await
            .map_err(map_db_error)?;

        let query = format!(
            "SELECT {} FROM {} {where_clause} ORDER BY {order} LIMIT $1 OFFSET $2",
            Self::COLUMNS,
            Self::TABLE
        );
        let data = sqlx::query_as::<_, Self::Entity>(&query)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await
            .map_err(map_db_error)?;

        warn_if_slow(Self::TABLE, "find_all", started);
        Ok(Page::new(data, params.page(), params.limit(), total))
    }

    /// Find a row by its internal ID. Includes soft-deleted rows.
    async fn find_by_id(pool: &PgPool, id: DbId) -> DbResult<Option<Self::Entity>> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1",
            Self::COLUMNS,
            Self::TABLE
        );
        sqlx::query_as::<_, Self::Entity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)
    }

    /// List rows matching the filter's criteria, paged and sorted.
    async fn find_by_criteria(
        pool: &PgPool,
        filter: &Self::Filter,
        params: &ListParams,
    ) -> DbResult<Vec<Self::Entity>> {
        let criteria = filter.build();
        let order = Self::order_clause(params)?;
        let limit_idx = criteria.next_placeholder();

        let query = format!(
            "SELECT {} FROM {} {} ORDER BY {order} LIMIT ${limit_idx} OFFSET ${}",
            Self::COLUMNS,
            Self::TABLE,
            criteria.where_clause(),
            limit_idx + 1
        );

        let started = Instant::now();
        let q = bind_values(sqlx::query_as::<_, Self::Entity>(&query), criteria.values());
        let rows = q
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await
            .map_err(map_db_error)?;
        warn_if_slow(Self::TABLE, "find_by_criteria", started);
        Ok(rows)
    }

    /// First row matching the filter, or `None`.
    async fn find_one_by_criteria(
        pool: &PgPool,
        filter: &Self::Filter,
    ) -> DbResult<Option<Self::Entity>> {
        let criteria = filter.build();
        let query = format!(
            "SELECT {} FROM {} {} ORDER BY {} LIMIT 1",
            Self::COLUMNS,
            Self::TABLE,
            criteria.where_clause(),
            Self::DEFAULT_ORDER
        );
        let q = bind_values(sqlx::query_as::<_, Self::Entity>(&query), criteria.values());
        q.fetch_optional(pool).await.map_err(map_db_error)
    }

    /// Physically delete a row. Returns `true` if a row was removed; a row
    /// still referenced elsewhere surfaces as a `Conflict`.
    async fn delete(pool: &PgPool, id: DbId) -> DbResult<bool> {
        let query = format!("DELETE FROM {} WHERE id = $1", Self::TABLE);
        let result = sqlx::query(&query)
            .bind(id)
            .execute(pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// Count rows matching `filter`, or all rows (minus the base predicate)
    /// when no filter is given.
    async fn count(pool: &PgPool, filter: Option<&Self::Filter>) -> DbResult<i64> {
        let criteria = match filter {
            Some(filter) => filter.build(),
            None => {
                let mut criteria = Criteria::new();
                if let Some(predicate) = Self::base_predicate() {
                    criteria.raw(predicate);
                }
                criteria
            }
        };

        let query = format!(
            "SELECT COUNT(*) FROM {} {}",
            Self::TABLE,
            criteria.where_clause()
        );
        let q = bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), criteria.values());
        q.fetch_one(pool).await.map_err(map_db_error)
    }
}
