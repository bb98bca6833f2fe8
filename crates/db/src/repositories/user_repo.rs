//! Repository for the `users` and `user_settings` tables.

use async_trait::async_trait;
use sqlx::PgPool;

use bms_core::error::CoreError;
use bms_core::types::{DbId, Timestamp};

use crate::error::{map_db_error, DbResult};
use crate::models::user::{CreateUser, UpdateUser, UpdateUserSettings, User, UserFilter, UserSettings};
use crate::repositories::ActivityLogRepo;
use crate::repository::Repository;
use crate::{with_transaction, PgTx};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, email, password_hash, role, status, reset_token, \
                       reset_token_expiry, last_login_at, created_at, updated_at";

const SETTINGS_COLUMNS: &str = "user_id, email_notifications, updated_at";

/// Provides CRUD and credential operations for users.
pub struct UserRepo;

#[async_trait]
impl Repository for UserRepo {
    type Entity = User;
    type Create = CreateUser;
    type Update = UpdateUser;
    type Filter = UserFilter;

    const TABLE: &'static str = "users";
    const ENTITY: &'static str = "user";
    const COLUMNS: &'static str = COLUMNS;
    const SORT_COLUMNS: &'static [&'static str] =
        &["name", "email", "role", "last_login_at", "created_at"];
    const DEFAULT_ORDER: &'static str = "created_at DESC";

    async fn create(pool: &PgPool, input: &CreateUser) -> DbResult<User> {
        let query = format!(
            "INSERT INTO users (name, email, password_hash, role)
             VALUES ($1, $2, $3, COALESCE($4, 'USER'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.role)
            .fetch_one(pool)
            .await
            .map_err(map_db_error)
    }

    async fn update(pool: &PgPool, id: DbId, input: &UpdateUser) -> DbResult<User> {
        let query = format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                status = COALESCE($5, status),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.role)
            .bind(input.status.map(|s| s.as_str()))
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))
    }

    async fn bulk_update(pool: &PgPool, ids: &[DbId], input: &UpdateUser) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                status = COALESCE($5, status),
                updated_at = NOW()
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.role)
        .bind(input.status.map(|s| s.as_str()))
        .execute(pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}

impl UserRepo {
    /// Find a user by email (case-sensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> DbResult<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)
    }

    /// Find a user by display name (case-sensitive).
    pub async fn find_by_name(pool: &PgPool, name: &str) -> DbResult<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE name = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)
    }

    /// Replace the password hash and clear any outstanding reset token in
    /// the same statement. Returns `true` if the row was updated.
    pub async fn update_password(pool: &PgPool, id: DbId, password_hash: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET
                password_hash = $2,
                reset_token = NULL,
                reset_token_expiry = NULL,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a password-reset token with its expiry.
    pub async fn set_reset_token(
        pool: &PgPool,
        id: DbId,
        token: &str,
        expiry: Timestamp,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expiry = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found(Self::ENTITY, id));
        }
        Ok(())
    }

    /// Resolve a reset token to its user. A token is valid only while its
    /// expiry lies strictly in the future.
    pub async fn validate_reset_token(pool: &PgPool, token: &str) -> DbResult<Option<User>> {
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE reset_token = $1 AND reset_token_expiry > NOW()"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)
    }

    /// Stamp `last_login_at` with the current time.
    pub async fn update_last_login(pool: &PgPool, id: DbId) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    /// Permanently remove a user and everything hanging off the row, in one
    /// transaction: activity logs first, then settings, then the user
    /// (foreign-key order). Returns `true` if the user existed.
    pub async fn hard_delete(pool: &PgPool, id: DbId) -> DbResult<bool> {
        with_transaction(pool, |tx| Box::pin(Self::hard_delete_inner(tx, id))).await
    }

    async fn hard_delete_inner(tx: &mut PgTx, id: DbId) -> DbResult<bool> {
        ActivityLogRepo::delete_by_user_tx(tx, id).await?;

        sqlx::query("DELETE FROM user_settings WHERE user_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// The user's settings row, or `None` before the first update.
    pub async fn get_settings(pool: &PgPool, user_id: DbId) -> DbResult<Option<UserSettings>> {
        let query = format!("SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE user_id = $1");
        sqlx::query_as::<_, UserSettings>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)
    }

    /// Upsert the settings row. An omitted field keeps the stored value; a
    /// stored `false` round-trips as `false`.
    pub async fn update_settings(
        pool: &PgPool,
        user_id: DbId,
        input: &UpdateUserSettings,
    ) -> DbResult<UserSettings> {
        let query = format!(
            "INSERT INTO user_settings (user_id, email_notifications)
             VALUES ($1, COALESCE($2, true))
             ON CONFLICT (user_id) DO UPDATE SET
                email_notifications = COALESCE($2, user_settings.email_notifications),
                updated_at = NOW()
             RETURNING {SETTINGS_COLUMNS}"
        );
        sqlx::query_as::<_, UserSettings>(&query)
            .bind(user_id)
            .bind(input.email_notifications)
            .fetch_one(pool)
            .await
            .map_err(map_db_error)
    }
}
