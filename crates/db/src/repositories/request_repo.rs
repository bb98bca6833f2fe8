//! Repository for the `contact_requests` table and the request workflow.
//!
//! Besides CRUD this owns the workflow operations: assignment, linking to an
//! existing customer, and the request-to-customer conversion. The conversion
//! runs as a single transaction; the request row is locked up front so two
//! concurrent conversions of the same request cannot both succeed.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use bms_core::error::CoreError;
use bms_core::scheduling::{resolve_appointment_date, StatsPeriod};
use bms_core::status::RequestStatus;
use bms_core::types::DbId;

use crate::error::{map_db_error, DbResult};
use crate::models::activity_log::{actions, CreateActivityLog};
use crate::models::appointment::{Appointment, CreateAppointment};
use crate::models::contact_request::{
    Actor, ContactRequest, ConversionResult, ConvertRequest, CreateContactRequest,
    CreateRequestNote, RequestAppointmentData, RequestFilter, RequestNote, RequestStats,
    UpdateContactRequest,
};
use crate::models::customer::CreateCustomer;
use crate::repositories::{ActivityLogRepo, AppointmentRepo, CustomerRepo, UserRepo};
use crate::repository::Repository;
use crate::{with_transaction, PgTx};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, email, phone, service, message, status, processor_id, \
                       customer_id, appointment_id, created_by, updated_by, \
                       created_at, updated_at";

const NOTE_COLUMNS: &str = "id, request_id, user_id, user_name, text, created_at";

/// Provides CRUD and workflow operations for contact requests.
pub struct RequestRepo;

#[async_trait]
impl Repository for RequestRepo {
    type Entity = ContactRequest;
    type Create = CreateContactRequest;
    type Update = UpdateContactRequest;
    type Filter = RequestFilter;

    const TABLE: &'static str = "contact_requests";
    const ENTITY: &'static str = "contact request";
    const COLUMNS: &'static str = COLUMNS;
    const SORT_COLUMNS: &'static [&'static str] =
        &["name", "email", "service", "status", "created_at", "updated_at"];
    const DEFAULT_ORDER: &'static str = "created_at DESC";

    async fn create(pool: &PgPool, input: &CreateContactRequest) -> DbResult<ContactRequest> {
        let query = format!(
            "INSERT INTO contact_requests (name, email, phone, service, message, status, created_by)
             VALUES ($1, $2, $3, $4, $5, 'NEW', $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.service)
            .bind(&input.message)
            .bind(&input.created_by)
            .fetch_one(pool)
            .await
            .map_err(map_db_error)
    }

    async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateContactRequest,
    ) -> DbResult<ContactRequest> {
        // A converted request must never regress to NEW.
        if input.status == Some(RequestStatus::New) {
            let current = Self::find_by_id(pool, id)
                .await?
                .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))?;
            if current.customer_id.is_some() {
                return Err(CoreError::validation(format!(
                    "contact request {id} is converted and cannot return to NEW"
                )));
            }
        }

        let query = format!(
            "UPDATE contact_requests SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                service = COALESCE($5, service),
                message = COALESCE($6, message),
                status = COALESCE($7, status),
                processor_id = COALESCE($8, processor_id),
                updated_by = COALESCE($9, updated_by),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.service)
            .bind(&input.message)
            .bind(input.status.map(|s| s.as_str()))
            .bind(input.processor_id)
            .bind(&input.updated_by)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))
    }

    async fn bulk_update(
        pool: &PgPool,
        ids: &[DbId],
        input: &UpdateContactRequest,
    ) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        // The status CASE keeps converted rows out of NEW, per-row, since a
        // bulk id list can mix converted and unconverted requests.
        let result = sqlx::query(
            "UPDATE contact_requests SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                service = COALESCE($5, service),
                message = COALESCE($6, message),
                status = CASE
                    WHEN $7 = 'NEW' AND customer_id IS NOT NULL THEN status
                    ELSE COALESCE($7, status)
                END,
                processor_id = COALESCE($8, processor_id),
                updated_by = COALESCE($9, updated_by),
                updated_at = NOW()
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.service)
        .bind(&input.message)
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.processor_id)
        .bind(&input.updated_by)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}

impl RequestRepo {
    /// Load a request inside a transaction with a row lock, so concurrent
    /// workflow operations on the same request serialize.
    pub(crate) async fn fetch_for_update(tx: &mut PgTx, id: DbId) -> DbResult<ContactRequest> {
        let query = format!("SELECT {COLUMNS} FROM contact_requests WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))
    }

    /// Assign a request to a user. A NEW request moves to IN_PROGRESS;
    /// any other status is untouched. Re-assignment simply overwrites the
    /// processor. An optional note is authored by the actor, falling back
    /// to the assigned user.
    pub async fn assign_to(
        pool: &PgPool,
        request_id: DbId,
        user_id: DbId,
        note: Option<&str>,
        actor: Option<&Actor>,
    ) -> DbResult<ContactRequest> {
        let user = UserRepo::find_by_id(pool, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", user_id))?;

        let query = format!(
            "UPDATE contact_requests SET
                processor_id = $2,
                status = CASE WHEN status = 'NEW' THEN 'IN_PROGRESS' ELSE status END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ContactRequest>(&query)
            .bind(request_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, request_id))?;

        if let Some(text) = note {
            let author = match actor {
                Some(actor) => (actor.id, actor.name.clone()),
                None => (user.id, user.name.clone()),
            };
            Self::add_note(
                pool,
                &CreateRequestNote {
                    request_id,
                    user_id: author.0,
                    user_name: author.1,
                    text: text.to_string(),
                },
            )
            .await?;
        }

        ActivityLogRepo::record(
            pool,
            &CreateActivityLog {
                entity_type: "contact_request".to_string(),
                entity_id: request_id,
                user_id: actor.map(|a| a.id),
                action: actions::REQUEST_ASSIGNED.to_string(),
                details: Some(json!({ "assigned_to": user_id, "assigned_name": user.name })),
                ip_address: None,
            },
        )
        .await;

        Ok(request)
    }

    /// Link a request to an existing customer. The link is set at most once;
    /// a second attempt is a conflict. A NEW request moves to IN_PROGRESS.
    pub async fn link_to_customer(
        pool: &PgPool,
        request_id: DbId,
        customer_id: DbId,
        acting_user_id: Option<DbId>,
    ) -> DbResult<ContactRequest> {
        CustomerRepo::find_by_id(pool, customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("customer", customer_id))?;

        // The guard lives in the UPDATE itself so two concurrent links cannot
        // both pass a read-then-write check; the loser matches zero rows.
        let query = format!(
            "UPDATE contact_requests SET
                customer_id = $2,
                status = CASE WHEN status = 'NEW' THEN 'IN_PROGRESS' ELSE status END,
                updated_at = NOW()
             WHERE id = $1 AND customer_id IS NULL
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, ContactRequest>(&query)
            .bind(request_id)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?;

        let Some(request) = updated else {
            // Zero rows: either the request is absent or already linked.
            let current = Self::find_by_id(pool, request_id)
                .await?
                .ok_or_else(|| CoreError::not_found(Self::ENTITY, request_id))?;
            let existing = current.customer_id.unwrap_or(customer_id);
            return Err(CoreError::conflict(format!(
                "contact request {request_id} is already linked to customer {existing}"
            )));
        };

        ActivityLogRepo::record(
            pool,
            &CreateActivityLog {
                entity_type: "contact_request".to_string(),
                entity_id: request_id,
                user_id: acting_user_id,
                action: actions::REQUEST_LINKED.to_string(),
                details: Some(json!({ "customer_id": customer_id })),
                ip_address: None,
            },
        )
        .await;

        Ok(request)
    }

    /// Convert a request into a customer, optionally scheduling an
    /// appointment, all in one transaction. Customer fields left out of the
    /// input default from the request itself. If any step fails -- including
    /// the activity log write -- the whole conversion rolls back.
    pub async fn convert_to_customer(
        pool: &PgPool,
        input: ConvertRequest,
    ) -> DbResult<ConversionResult> {
        with_transaction(pool, move |tx| {
            Box::pin(async move { Self::convert_inner(tx, &input).await })
        })
        .await
    }

    async fn convert_inner(tx: &mut PgTx, input: &ConvertRequest) -> DbResult<ConversionResult> {
        let request = Self::fetch_for_update(tx, input.request_id).await?;
        if let Some(existing) = request.customer_id {
            return Err(CoreError::conflict(format!(
                "contact request {} is already converted to customer {existing}",
                request.id
            )));
        }

        let overrides = input.customer.clone().unwrap_or_default();
        let customer = CustomerRepo::create_tx(
            tx,
            &CreateCustomer {
                name: overrides.name.unwrap_or_else(|| request.name.clone()),
                company: overrides.company,
                email: overrides.email.unwrap_or_else(|| request.email.clone()),
                phone: overrides.phone.or_else(|| request.phone.clone()),
                street: overrides.street,
                postal_code: overrides.postal_code,
                city: overrides.city,
                country: overrides.country,
                customer_type: overrides.customer_type,
                status: None,
                newsletter: overrides.newsletter,
            },
        )
        .await?;

        let query = format!(
            "UPDATE contact_requests SET
                customer_id = $2,
                status = 'COMPLETED',
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let mut request = sqlx::query_as::<_, ContactRequest>(&query)
            .bind(request.id)
            .bind(customer.id)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_db_error)?;

        ActivityLogRepo::insert_tx(
            tx,
            &CreateActivityLog {
                entity_type: "contact_request".to_string(),
                entity_id: request.id,
                user_id: input.acting_user_id,
                action: actions::REQUEST_CONVERTED.to_string(),
                details: Some(json!({ "customer_id": customer.id })),
                ip_address: None,
            },
        )
        .await?;

        let appointment = if input.create_appointment {
            let (appointment, updated) = Self::create_appointment_tx(
                tx,
                &request,
                customer.id,
                input.appointment.as_ref(),
                input.acting_user_id,
            )
            .await?;
            request = updated;
            Some(appointment)
        } else {
            None
        };

        Ok(ConversionResult {
            customer,
            appointment,
            request,
        })
    }

    /// Create an appointment for a request inside an open transaction and
    /// link it back. Returns the appointment and the refreshed request.
    async fn create_appointment_tx(
        tx: &mut PgTx,
        request: &ContactRequest,
        customer_id: DbId,
        data: Option<&RequestAppointmentData>,
        acting_user_id: Option<DbId>,
    ) -> DbResult<(Appointment, ContactRequest)> {
        let defaults = RequestAppointmentData::default();
        let data = data.unwrap_or(&defaults);

        let date = resolve_appointment_date(data.date, data.date_raw.as_deref(), Utc::now())?;
        let title = data
            .title
            .clone()
            .unwrap_or_else(|| format!("Termin: {}", request.service));

        let appointment = AppointmentRepo::create_tx(
            tx,
            &CreateAppointment {
                title,
                customer_id: Some(customer_id),
                appointment_date: date,
                duration_minutes: data.duration_minutes,
                location: data.location.clone(),
                description: data.description.clone(),
                status: None,
                created_by: None,
            },
        )
        .await?;

        let query = format!(
            "UPDATE contact_requests SET
                appointment_id = $2,
                status = CASE WHEN status = 'NEW' THEN 'IN_PROGRESS' ELSE status END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ContactRequest>(&query)
            .bind(request.id)
            .bind(appointment.id)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_db_error)?;

        ActivityLogRepo::insert_tx(
            tx,
            &CreateActivityLog {
                entity_type: "contact_request".to_string(),
                entity_id: request.id,
                user_id: acting_user_id,
                action: actions::APPOINTMENT_CREATED.to_string(),
                details: Some(json!({ "appointment_id": appointment.id })),
                ip_address: None,
            },
        )
        .await?;

        Ok((appointment, request))
    }

    /// Create an appointment for an existing request without converting it.
    /// The request must already carry a customer link for the appointment to
    /// reference; without one the appointment is created unlinked.
    pub async fn create_appointment(
        pool: &PgPool,
        request_id: DbId,
        data: RequestAppointmentData,
        acting_user_id: Option<DbId>,
    ) -> DbResult<(Appointment, ContactRequest)> {
        with_transaction(pool, move |tx| {
            Box::pin(async move {
                let request = Self::fetch_for_update(tx, request_id).await?;
                match request.customer_id {
                    Some(customer_id) => {
                        Self::create_appointment_tx(
                            tx,
                            &request,
                            customer_id,
                            Some(&data),
                            acting_user_id,
                        )
                        .await
                    }
                    None => {
                        Self::create_appointment_unlinked_tx(tx, &request, &data, acting_user_id)
                            .await
                    }
                }
            })
        })
        .await
    }

    async fn create_appointment_unlinked_tx(
        tx: &mut PgTx,
        request: &ContactRequest,
        data: &RequestAppointmentData,
        acting_user_id: Option<DbId>,
    ) -> DbResult<(Appointment, ContactRequest)> {
        let date = resolve_appointment_date(data.date, data.date_raw.as_deref(), Utc::now())?;
        let title = data
            .title
            .clone()
            .unwrap_or_else(|| format!("Termin: {}", request.service));

        let appointment = AppointmentRepo::create_tx(
            tx,
            &CreateAppointment {
                title,
                customer_id: None,
                appointment_date: date,
                duration_minutes: data.duration_minutes,
                location: data.location.clone(),
                description: data.description.clone(),
                status: None,
                created_by: None,
            },
        )
        .await?;

        let query = format!(
            "UPDATE contact_requests SET
                appointment_id = $2,
                status = CASE WHEN status = 'NEW' THEN 'IN_PROGRESS' ELSE status END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ContactRequest>(&query)
            .bind(request.id)
            .bind(appointment.id)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_db_error)?;

        ActivityLogRepo::insert_tx(
            tx,
            &CreateActivityLog {
                entity_type: "contact_request".to_string(),
                entity_id: request.id,
                user_id: acting_user_id,
                action: actions::APPOINTMENT_CREATED.to_string(),
                details: Some(json!({ "appointment_id": appointment.id })),
                ip_address: None,
            },
        )
        .await?;

        Ok((appointment, request))
    }

    /// Set a request's status, logging the change best-effort. A converted
    /// request cannot regress to NEW. An optional note is recorded when an
    /// actor is supplied.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: RequestStatus,
        note: Option<&str>,
        actor: Option<&Actor>,
    ) -> DbResult<ContactRequest> {
        if status == RequestStatus::New {
            let current = Self::find_by_id(pool, id)
                .await?
                .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))?;
            if current.customer_id.is_some() {
                return Err(CoreError::validation(format!(
                    "contact request {id} is converted and cannot return to NEW"
                )));
            }
        }

        let query = format!(
            "UPDATE contact_requests SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ContactRequest>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found(Self::ENTITY, id))?;

        if let (Some(text), Some(actor)) = (note, actor) {
            Self::add_note(
                pool,
                &CreateRequestNote {
                    request_id: id,
                    user_id: actor.id,
                    user_name: actor.name.clone(),
                    text: text.to_string(),
                },
            )
            .await?;
        }

        ActivityLogRepo::record(
            pool,
            &CreateActivityLog {
                entity_type: "contact_request".to_string(),
                entity_id: id,
                user_id: actor.map(|a| a.id),
                action: actions::REQUEST_STATUS_CHANGED.to_string(),
                details: Some(json!({ "status": status.as_str() })),
                ip_address: None,
            },
        )
        .await;

        Ok(request)
    }

    /// Attach a note to a request. The author's name is stored alongside the
    /// id so the note survives user deletion.
    pub async fn add_note(pool: &PgPool, note: &CreateRequestNote) -> DbResult<RequestNote> {
        let query = format!(
            "INSERT INTO request_notes (request_id, user_id, user_name, text)
             VALUES ($1, $2, $3, $4)
             RETURNING {NOTE_COLUMNS}"
        );
        sqlx::query_as::<_, RequestNote>(&query)
            .bind(note.request_id)
            .bind(note.user_id)
            .bind(&note.user_name)
            .bind(&note.text)
            .fetch_one(pool)
            .await
            .map_err(map_db_error)
    }

    /// All notes for a request, newest first.
    pub async fn get_notes(pool: &PgPool, request_id: DbId) -> DbResult<Vec<RequestNote>> {
        let query = format!(
            "SELECT {NOTE_COLUMNS} FROM request_notes \
             WHERE request_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, RequestNote>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
            .map_err(map_db_error)
    }

    /// Delete a note, scoped to its request. Returns `true` if removed.
    pub async fn delete_note(pool: &PgPool, request_id: DbId, note_id: DbId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM request_notes WHERE id = $1 AND request_id = $2")
            .bind(note_id)
            .bind(request_id)
            .execute(pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// Aggregate request counts over the rolling window ending now.
    pub async fn get_stats(pool: &PgPool, period: StatsPeriod) -> DbResult<RequestStats> {
        let window_start = period.window_start(Utc::now());
        let row: (i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'NEW'),
                    COUNT(*) FILTER (WHERE status = 'IN_PROGRESS'),
                    COUNT(*) FILTER (WHERE status = 'COMPLETED'),
                    COUNT(*) FILTER (WHERE status = 'CANCELLED'),
                    COUNT(*) FILTER (WHERE customer_id IS NOT NULL)
             FROM contact_requests
             WHERE created_at >= $1",
        )
        .bind(window_start)
        .fetch_one(pool)
        .await
        .map_err(map_db_error)?;

        let (total, new, in_progress, completed, cancelled, converted) = row;
        let conversion_rate = if total > 0 {
            converted as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Ok(RequestStats {
            total,
            new,
            in_progress,
            completed,
            cancelled,
            converted,
            conversion_rate,
        })
    }
}
