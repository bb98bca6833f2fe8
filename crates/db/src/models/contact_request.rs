//! Contact request entity models and conversion-workflow DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bms_core::scheduling::day_bounds;
use bms_core::status::{CustomerType, RequestStatus};
use bms_core::types::{DbId, Timestamp};

use crate::criteria::{BindValue, Criteria, CriteriaBuilder};
use crate::models::appointment::Appointment;
use crate::models::customer::Customer;

/// Full contact request row from the `contact_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactRequest {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    pub processor_id: Option<DbId>,
    pub customer_id: Option<DbId>,
    pub appointment_id: Option<DbId>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new contact request (status starts at NEW).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service: String,
    pub message: String,
    pub created_by: Option<String>,
}

/// DTO for updating an existing contact request. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service: Option<String>,
    pub message: Option<String>,
    pub status: Option<RequestStatus>,
    pub processor_id: Option<DbId>,
    pub updated_by: Option<String>,
}

/// A note attached to a contact request. Author name is denormalized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestNote {
    pub id: DbId,
    pub request_id: DbId,
    pub user_id: DbId,
    pub user_name: String,
    pub text: String,
    pub created_at: Timestamp,
}

/// DTO for adding a note to a contact request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestNote {
    pub request_id: DbId,
    pub user_id: DbId,
    pub user_name: String,
    pub text: String,
}

/// The user performing a workflow operation; used for notes and log entries.
#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub id: DbId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Conversion workflow DTOs
// ---------------------------------------------------------------------------

/// Customer field overrides for a conversion; anything left `None` defaults
/// from the request itself (name/email/phone) or the schema defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertCustomerData {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub newsletter: Option<bool>,
}

/// Appointment data supplied when a conversion (or a standalone
/// create-appointment call) should schedule a meeting. `date` takes
/// precedence over `date_raw`; with neither the date defaults to two days
/// out at noon.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestAppointmentData {
    pub title: Option<String>,
    pub date: Option<Timestamp>,
    pub date_raw: Option<String>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Input for the request-to-customer conversion saga.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertRequest {
    pub request_id: DbId,
    pub customer: Option<ConvertCustomerData>,
    #[serde(default)]
    pub create_appointment: bool,
    pub appointment: Option<RequestAppointmentData>,
    pub acting_user_id: Option<DbId>,
}

/// Everything the conversion saga produced, committed atomically.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub customer: Customer,
    pub appointment: Option<Appointment>,
    pub request: ContactRequest,
}

/// Aggregated request counts over a rolling window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestStats {
    pub total: i64,
    pub new: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
    /// Requests with a linked or converted customer.
    pub converted: i64,
    /// converted / total * 100; 0 for an empty window.
    pub conversion_rate: f64,
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Filter parameters for contact request queries.
///
/// `unassigned`/`not_converted` translate to IS NULL predicates; `today`
/// takes precedence over an explicit `start_date`/`end_date` range.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFilter {
    /// Case-insensitive contains over name/email/service/message.
    pub search: Option<String>,
    pub status: Option<RequestStatus>,
    pub processor_id: Option<DbId>,
    pub customer_id: Option<DbId>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub unassigned: bool,
    #[serde(default)]
    pub not_converted: bool,
    #[serde(default)]
    pub today: bool,
}

impl CriteriaBuilder for RequestFilter {
    fn build(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if let Some(ref term) = self.search {
            criteria.contains_any(&["name", "email", "service", "message"], term);
        }
        if let Some(status) = self.status {
            criteria.eq("status", BindValue::Text(status.as_str().to_string()));
        }
        if self.unassigned {
            criteria.is_null("processor_id");
        } else if let Some(processor_id) = self.processor_id {
            criteria.eq("processor_id", BindValue::BigInt(processor_id));
        }
        if self.not_converted {
            criteria.is_null("customer_id");
        } else if let Some(customer_id) = self.customer_id {
            criteria.eq("customer_id", BindValue::BigInt(customer_id));
        }
        if self.today {
            let (start, end) = day_bounds(chrono::Utc::now().date_naive());
            criteria.between("created_at", Some(start), Some(end));
        } else {
            criteria.between("created_at", self.start_date, self.end_date);
        }
        criteria
    }
}
