//! Activity log entity model and DTOs.
//!
//! The activity log is an append-only audit trail written best-effort for
//! every state-changing operation with user-visible effect. Entries have no
//! `updated_at` (immutable records).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bms_core::types::{DbId, Timestamp};

use crate::criteria::{BindValue, Criteria, CriteriaBuilder};

/// Action names recorded by the repositories.
pub mod actions {
    pub const REQUEST_ASSIGNED: &str = "REQUEST_ASSIGNED";
    pub const REQUEST_LINKED: &str = "REQUEST_LINKED";
    pub const REQUEST_CONVERTED: &str = "REQUEST_CONVERTED";
    pub const REQUEST_STATUS_CHANGED: &str = "REQUEST_STATUS_CHANGED";
    pub const APPOINTMENT_CREATED: &str = "APPOINTMENT_CREATED";
    pub const APPOINTMENT_STATUS_CHANGED: &str = "APPOINTMENT_STATUS_CHANGED";
    pub const CUSTOMER_STATUS_CHANGED: &str = "CUSTOMER_STATUS_CHANGED";
    pub const CUSTOMER_DELETED: &str = "CUSTOMER_DELETED";
    pub const NEWSLETTER_UPDATED: &str = "NEWSLETTER_UPDATED";
}

/// A single activity log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLog {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub user_id: Option<DbId>,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for inserting a new activity log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivityLog {
    pub entity_type: String,
    pub entity_id: DbId,
    pub user_id: Option<DbId>,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

/// Filter parameters for querying the log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityLogFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub action: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl CriteriaBuilder for ActivityLogFilter {
    fn build(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if let Some(ref entity_type) = self.entity_type {
            criteria.eq("entity_type", BindValue::Text(entity_type.clone()));
        }
        if let Some(entity_id) = self.entity_id {
            criteria.eq("entity_id", BindValue::BigInt(entity_id));
        }
        if let Some(user_id) = self.user_id {
            criteria.eq("user_id", BindValue::BigInt(user_id));
        }
        if let Some(ref action) = self.action {
            criteria.eq("action", BindValue::Text(action.clone()));
        }
        criteria.between("created_at", self.from, self.to);
        criteria
    }
}
