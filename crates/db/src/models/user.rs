//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bms_core::status::UserStatus;
use bms_core::types::{DbId, Timestamp};

use crate::criteria::{BindValue, Criteria, CriteriaBuilder};

/// Full user row from the `users` table.
///
/// Contains the password hash -- never serialize this to external responses.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<Timestamp>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new user. Role defaults to USER, status to ACTIVE.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Option<String>,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<UserStatus>,
}

/// Per-user preferences. One row per user, created lazily on first update.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserSettings {
    pub user_id: DbId,
    pub email_notifications: bool,
    pub updated_at: Timestamp,
}

/// DTO for patching user settings. An omitted field keeps the stored value;
/// an explicit `false` is respected, not re-defaulted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserSettings {
    pub email_notifications: Option<bool>,
}

/// Filter parameters for user queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive contains over name/email.
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<UserStatus>,
}

impl CriteriaBuilder for UserFilter {
    fn build(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if let Some(ref term) = self.search {
            criteria.contains_any(&["name", "email"], term);
        }
        if let Some(ref role) = self.role {
            criteria.eq("role", BindValue::Text(role.clone()));
        }
        if let Some(status) = self.status {
            criteria.eq("status", BindValue::Text(status.as_str().to_string()));
        }
        criteria
    }
}
