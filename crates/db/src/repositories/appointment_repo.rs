//! Repository for the `appointments` table and its notes.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use sqlx::{PgExecutor, PgPool};

use bms_core::error::CoreError;
use bms_core::scheduling::day_bounds;
use bms_core::status::AppointmentStatus;
use bms_core::types::{DbId, Timestamp};

use crate::error::{map_db_error, DbResult};
use crate::models::activity_log::{actions, CreateActivityLog};
use crate::models::appointment::{
    Appointment, AppointmentFilter, AppointmentNote, CreateAppointment, CreateAppointmentNote,
    UpdateAppointment,
};
use crate::repositories::ActivityLogRepo;
use crate::repository::Repository;
use crate::PgTx;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, customer_id, appointment_date, duration_minutes, location, \
                       description, status, created_by, created_at, updated_at";

const NOTE_COLUMNS: &str = "id, appointment_id, user_id, user_name, text, created_at";

/// Provides CRUD and scheduling queries for appointments.
pub struct AppointmentRepo;

#[async_trait]
impl Repository for AppointmentRepo {
    type Entity = Appointment;
    type Create = CreateAppointment;
    type Update = UpdateAppointment;
    type Filter = AppointmentFilter;

    const TABLE: &'static str = "appointments";
    const ENTITY: &'static str = "appointment";
    const COLUMNS: &'static str = COLUMNS;
    const SORT_COLUMNS: &'static [&'static str] =
        &["title", "appointment_date", "status", "created_at", "updated_at"];
    const DEFAULT_ORDER: &'static str = "appointment_date DESC";

    async fn create(pool: &PgPool, input: &CreateAppointment) -> DbResult<Appointment> {
        Self::create_with(pool, input).await
    }

    async fn update(pool: &PgPool, id: DbId, input: &UpdateAppointment) -> DbResult<Appointment> {
        let query = format!(
            "UPDATE appointments SET
                title = COALESCE($2, title),
                customer_id = COALESCE($3, customer_id),
                appointment_date = COALESCE($4, appointment_date),
                duration_minutes = COALESCE($5, duration_minutes),
                location = COALESCE($6, location),
                description = COALESCE($7, description),
                status = COALESCE($8, status),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.customer_id)
            .bind(input.appointment_date)
            .bind(input.duration_minutes)
            .bind(&input.location)
            .bind(&input.description)
            .bind(input.status.map(|s| s.as_str()))
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))
    }

    async fn bulk_update(pool: &PgPool, ids: &[DbId], input: &UpdateAppointment) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE appointments SET
                title = COALESCE($2, title),
                customer_id = COALESCE($3, customer_id),
                appointment_date = COALESCE($4, appointment_date),
                duration_minutes = COALESCE($5, duration_minutes),
                location = COALESCE($6, location),
                description = COALESCE($7, description),
                status = COALESCE($8, status),
                updated_at = NOW()
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(&input.title)
        .bind(input.customer_id)
        .bind(input.appointment_date)
        .bind(input.duration_minutes)
        .bind(&input.location)
        .bind(&input.description)
        .bind(input.status.map(|s| s.as_str()))
        .execute(pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}

impl AppointmentRepo {
    /// Insert against any executor so the conversion saga can reuse the
    /// statement inside its transaction.
    pub(crate) async fn create_with<'e, E>(
        executor: E,
        input: &CreateAppointment,
    ) -> DbResult<Appointment>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO appointments
                (title, customer_id, appointment_date, duration_minutes,
                 location, description, status, created_by)
             VALUES ($1, $2, $3, COALESCE($4, 60), $5, $6, COALESCE($7, 'PLANNED'), $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(&input.title)
            .bind(input.customer_id)
            .bind(input.appointment_date)
            .bind(input.duration_minutes)
            .bind(&input.location)
            .bind(&input.description)
            .bind(input.status.map(|s| s.as_str()))
            .bind(&input.created_by)
            .fetch_one(executor)
            .await
            .map_err(map_db_error)
    }

    /// Insert within an open transaction (conversion saga step).
    pub(crate) async fn create_tx(tx: &mut PgTx, input: &CreateAppointment) -> DbResult<Appointment> {
        Self::create_with(&mut **tx, input).await
    }

    /// All appointments for a customer, newest date first.
    pub async fn find_by_customer(pool: &PgPool, customer_id: DbId) -> DbResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE customer_id = $1 ORDER BY appointment_date DESC"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(customer_id)
            .fetch_all(pool)
            .await
            .map_err(map_db_error)
    }

    /// Appointments within `[start, end]`, ascending by date.
    pub async fn find_by_date_range(
        pool: &PgPool,
        start: Timestamp,
        end: Timestamp,
    ) -> DbResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE appointment_date >= $1 AND appointment_date <= $2 \
             ORDER BY appointment_date ASC"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
            .map_err(map_db_error)
    }

    /// All appointments on a calendar day (UTC).
    pub async fn find_by_date(pool: &PgPool, date: NaiveDate) -> DbResult<Vec<Appointment>> {
        let (start, end) = day_bounds(date);
        Self::find_by_date_range(pool, start, end).await
    }

    /// The next appointments from now on, cancelled ones excluded, soonest
    /// first, capped at `limit`.
    pub async fn find_upcoming(pool: &PgPool, limit: i64) -> DbResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE status <> 'CANCELLED' AND appointment_date >= NOW() \
             ORDER BY appointment_date ASC LIMIT $1"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(map_db_error)
    }

    /// Set an appointment's status from a raw string, logging best-effort.
    /// An unknown status value is a validation error.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
        acting_user_id: Option<DbId>,
    ) -> DbResult<Appointment> {
        let status = AppointmentStatus::parse(status)?;
        let query = format!(
            "UPDATE appointments SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let appointment = sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))?;

        ActivityLogRepo::record(
            pool,
            &CreateActivityLog {
                entity_type: "appointment".to_string(),
                entity_id: id,
                user_id: acting_user_id,
                action: actions::APPOINTMENT_STATUS_CHANGED.to_string(),
                details: Some(json!({ "status": status.as_str() })),
                ip_address: None,
            },
        )
        .await;

        Ok(appointment)
    }

    /// Attach a note to an appointment. The author's name is stored alongside
    /// the id so the note survives user deletion.
    pub async fn add_note(pool: &PgPool, note: &CreateAppointmentNote) -> DbResult<AppointmentNote> {
        let query = format!(
            "INSERT INTO appointment_notes (appointment_id, user_id, user_name, text)
             VALUES ($1, $2, $3, $4)
             RETURNING {NOTE_COLUMNS}"
        );
        sqlx::query_as::<_, AppointmentNote>(&query)
            .bind(note.appointment_id)
            .bind(note.user_id)
            .bind(&note.user_name)
            .bind(&note.text)
            .fetch_one(pool)
            .await
            .map_err(map_db_error)
    }

    /// All notes for an appointment, newest first.
    pub async fn find_notes(pool: &PgPool, appointment_id: DbId) -> DbResult<Vec<AppointmentNote>> {
        let query = format!(
            "SELECT {NOTE_COLUMNS} FROM appointment_notes \
             WHERE appointment_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, AppointmentNote>(&query)
            .bind(appointment_id)
            .fetch_all(pool)
            .await
            .map_err(map_db_error)
    }
}
