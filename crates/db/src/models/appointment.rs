//! Appointment entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bms_core::scheduling::day_bounds;
use bms_core::status::AppointmentStatus;
use bms_core::types::{DbId, Timestamp};

use crate::criteria::{BindValue, Criteria, CriteriaBuilder};

/// Full appointment row from the `appointments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: DbId,
    pub title: String,
    pub customer_id: Option<DbId>,
    pub appointment_date: Timestamp,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub created_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new appointment. Duration defaults to 60 minutes and
/// status to PLANNED in the insert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppointment {
    pub title: String,
    pub customer_id: Option<DbId>,
    pub appointment_date: Timestamp,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub created_by: Option<String>,
}

/// DTO for updating an existing appointment. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointment {
    pub title: Option<String>,
    pub customer_id: Option<DbId>,
    pub appointment_date: Option<Timestamp>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: Option<AppointmentStatus>,
}

/// A note attached to an appointment. The author's name is denormalized so
/// notes survive user deletion.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AppointmentNote {
    pub id: DbId,
    pub appointment_id: DbId,
    pub user_id: DbId,
    pub user_name: String,
    pub text: String,
    pub created_at: Timestamp,
}

/// DTO for adding a note to an appointment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentNote {
    pub appointment_id: DbId,
    pub user_id: DbId,
    pub user_name: String,
    pub text: String,
}

/// Filter parameters for appointment queries.
///
/// The convenience flags (`today`, `upcoming`, `past`) take precedence over
/// an explicit `start_date`/`end_date` range; when one of them is set the
/// explicit range is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    /// Case-insensitive contains over title/location/description.
    pub search: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub customer_id: Option<DbId>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub today: bool,
    #[serde(default)]
    pub upcoming: bool,
    #[serde(default)]
    pub past: bool,
}

impl CriteriaBuilder for AppointmentFilter {
    fn build(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if let Some(ref term) = self.search {
            criteria.contains_any(&["title", "location", "description"], term);
        }
        if let Some(status) = self.status {
            criteria.eq("status", BindValue::Text(status.as_str().to_string()));
        }
        if let Some(customer_id) = self.customer_id {
            criteria.eq("customer_id", BindValue::BigInt(customer_id));
        }

        let now = chrono::Utc::now();
        if self.today {
            let (start, end) = day_bounds(now.date_naive());
            criteria.between("appointment_date", Some(start), Some(end));
        } else if self.upcoming {
            criteria.between("appointment_date", Some(now), None);
        } else if self.past {
            criteria.between("appointment_date", None, Some(now));
        } else {
            criteria.between("appointment_date", self.start_date, self.end_date);
        }
        criteria
    }
}
