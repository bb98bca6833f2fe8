//! Repository for the `customers` table.
//!
//! Customers are soft-deleted: `status = 'DELETED'` keeps the row but hides
//! it from default listing, counting, and search. A direct `find_by_id`
//! still returns the row.

use async_trait::async_trait;
use serde_json::json;
use sqlx::{PgExecutor, PgPool};

use bms_core::error::CoreError;
use bms_core::status::CustomerStatus;
use bms_core::types::DbId;

use crate::error::{map_db_error, DbResult};
use crate::models::activity_log::{actions, CreateActivityLog};
use crate::models::customer::{CreateCustomer, Customer, CustomerFilter, UpdateCustomer};
use crate::repositories::ActivityLogRepo;
use crate::repository::Repository;
use crate::PgTx;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, company, email, phone, street, postal_code, city, country, \
                       customer_type, status, newsletter, created_at, updated_at";

/// Provides CRUD and search operations for customers.
pub struct CustomerRepo;

#[async_trait]
impl Repository for CustomerRepo {
    type Entity = Customer;
    type Create = CreateCustomer;
    type Update = UpdateCustomer;
    type Filter = CustomerFilter;

    const TABLE: &'static str = "customers";
    const ENTITY: &'static str = "customer";
    const COLUMNS: &'static str = COLUMNS;
    const SORT_COLUMNS: &'static [&'static str] =
        &["name", "company", "email", "city", "created_at", "updated_at"];
    const DEFAULT_ORDER: &'static str = "created_at DESC";

    fn base_predicate() -> Option<&'static str> {
        Some("status <> 'DELETED'")
    }

    async fn create(pool: &PgPool, input: &CreateCustomer) -> DbResult<Customer> {
        Self::create_with(pool, input).await
    }

    async fn update(pool: &PgPool, id: DbId, input: &UpdateCustomer) -> DbResult<Customer> {
        let query = format!(
            "UPDATE customers SET
                name = COALESCE($2, name),
                company = COALESCE($3, company),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                street = COALESCE($6, street),
                postal_code = COALESCE($7, postal_code),
                city = COALESCE($8, city),
                country = COALESCE($9, country),
                customer_type = COALESCE($10, customer_type),
                status = COALESCE($11, status),
                newsletter = COALESCE($12, newsletter),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.company)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.street)
            .bind(&input.postal_code)
            .bind(&input.city)
            .bind(&input.country)
            .bind(input.customer_type.map(|t| t.as_str()))
            .bind(input.status.map(|s| s.as_str()))
            .bind(input.newsletter)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))
    }

    async fn bulk_update(pool: &PgPool, ids: &[DbId], input: &UpdateCustomer) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE customers SET
                name = COALESCE($2, name),
                company = COALESCE($3, company),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                street = COALESCE($6, street),
                postal_code = COALESCE($7, postal_code),
                city = COALESCE($8, city),
                country = COALESCE($9, country),
                customer_type = COALESCE($10, customer_type),
                status = COALESCE($11, status),
                newsletter = COALESCE($12, newsletter),
                updated_at = NOW()
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(&input.name)
        .bind(&input.company)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.street)
        .bind(&input.postal_code)
        .bind(&input.city)
        .bind(&input.country)
        .bind(input.customer_type.map(|t| t.as_str()))
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.newsletter)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}

impl CustomerRepo {
    /// Insert against any executor so the conversion saga can reuse the
    /// statement inside its transaction.
    pub(crate) async fn create_with<'e, E>(executor: E, input: &CreateCustomer) -> DbResult<Customer>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO customers
                (name, company, email, phone, street, postal_code, city,
                 country, customer_type, status, newsletter)
             VALUES ($1, $2, $3, $4, $5, $6, $7,
                     COALESCE($8, 'Deutschland'),
                     COALESCE($9, 'PRIVATE'),
                     COALESCE($10, 'ACTIVE'),
                     COALESCE($11, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(&input.name)
            .bind(&input.company)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.street)
            .bind(&input.postal_code)
            .bind(&input.city)
            .bind(&input.country)
            .bind(input.customer_type.map(|t| t.as_str()))
            .bind(input.status.map(|s| s.as_str()))
            .bind(input.newsletter)
            .fetch_one(executor)
            .await
            .map_err(map_db_error)
    }

    /// Insert within an open transaction (conversion saga step).
    pub(crate) async fn create_tx(tx: &mut PgTx, input: &CreateCustomer) -> DbResult<Customer> {
        Self::create_with(&mut **tx, input).await
    }

    /// First non-deleted customer with this email, or `None`.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> DbResult<Option<Customer>> {
        let query = format!(
            "SELECT {COLUMNS} FROM customers \
             WHERE email = $1 AND status <> 'DELETED' \
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)
    }

    /// Case-insensitive search over name/company/email/phone/city, excluding
    /// soft-deleted rows, capped at `limit`.
    pub async fn search(pool: &PgPool, term: &str, limit: i64) -> DbResult<Vec<Customer>> {
        let query = format!(
            "SELECT {COLUMNS} FROM customers \
             WHERE status <> 'DELETED' AND ( \
                 name ILIKE $1 OR company ILIKE $1 OR email ILIKE $1 \
                 OR phone ILIKE $1 OR city ILIKE $1) \
             ORDER BY name ASC LIMIT $2"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(format!("%{term}%"))
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(map_db_error)
    }

    /// Set a customer's status, logging the change best-effort.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: CustomerStatus,
        acting_user_id: Option<DbId>,
    ) -> DbResult<Customer> {
        let query = format!(
            "UPDATE customers SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let customer = sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))?;

        ActivityLogRepo::record(
            pool,
            &CreateActivityLog {
                entity_type: "customer".to_string(),
                entity_id: id,
                user_id: acting_user_id,
                action: actions::CUSTOMER_STATUS_CHANGED.to_string(),
                details: Some(json!({ "status": status.as_str() })),
                ip_address: None,
            },
        )
        .await;

        Ok(customer)
    }

    /// Soft-delete: mark the row DELETED without removing it. Returns `true`
    /// if the row was newly marked. Idempotent (second call returns `false`).
    pub async fn soft_delete(
        pool: &PgPool,
        id: DbId,
        acting_user_id: Option<DbId>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE customers SET status = 'DELETED', updated_at = NOW() \
             WHERE id = $1 AND status <> 'DELETED'",
        )
        .bind(id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            ActivityLogRepo::record(
                pool,
                &CreateActivityLog {
                    entity_type: "customer".to_string(),
                    entity_id: id,
                    user_id: acting_user_id,
                    action: actions::CUSTOMER_DELETED.to_string(),
                    details: None,
                    ip_address: None,
                },
            )
            .await;
        }
        Ok(deleted)
    }

    /// Flip the newsletter subscription, logging the change best-effort.
    pub async fn update_newsletter(
        pool: &PgPool,
        id: DbId,
        subscribed: bool,
        acting_user_id: Option<DbId>,
    ) -> DbResult<Customer> {
        let query = format!(
            "UPDATE customers SET newsletter = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let customer = sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .bind(subscribed)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))?;

        ActivityLogRepo::record(
            pool,
            &CreateActivityLog {
                entity_type: "customer".to_string(),
                entity_id: id,
                user_id: acting_user_id,
                action: actions::NEWSLETTER_UPDATED.to_string(),
                details: Some(json!({ "newsletter": subscribed })),
                ip_address: None,
            },
        )
        .await;

        Ok(customer)
    }
}
