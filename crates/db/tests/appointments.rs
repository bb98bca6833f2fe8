//! Appointment repository: defaults, calendar queries, status changes,
//! and notes.

mod common;

use assert_matches::assert_matches;
use bms_core::error::CoreError;
use bms_core::status::AppointmentStatus;
use bms_db::models::appointment::{CreateAppointment, CreateAppointmentNote};
use bms_db::repositories::{ActivityLogRepo, AppointmentRepo, UserRepo};
use bms_db::repository::Repository;
use chrono::{Duration, NaiveDate, Utc};
use common::{at, new_appointment, new_user};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_applies_schema_defaults(pool: PgPool) {
    let appointment = AppointmentRepo::create(&pool, &new_appointment("Beratung", at(2026, 9, 1, 10, 0)))
        .await
        .unwrap();
    assert_eq!(appointment.duration_minutes, 60);
    assert_eq!(appointment.status, AppointmentStatus::Planned);
    assert!(appointment.customer_id.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upcoming_excludes_past_and_cancelled(pool: PgPool) {
    let now = Utc::now();

    let soon = AppointmentRepo::create(&pool, &new_appointment("Soon", now + Duration::hours(2)))
        .await
        .unwrap();
    let later = AppointmentRepo::create(&pool, &new_appointment("Later", now + Duration::days(3)))
        .await
        .unwrap();
    AppointmentRepo::create(&pool, &new_appointment("Past", now - Duration::days(1)))
        .await
        .unwrap();
    let cancelled =
        AppointmentRepo::create(&pool, &new_appointment("Dropped", now + Duration::days(1)))
            .await
            .unwrap();
    AppointmentRepo::update_status(&pool, cancelled.id, "CANCELLED", None)
        .await
        .unwrap();

    let upcoming = AppointmentRepo::find_upcoming(&pool, 10).await.unwrap();
    let ids: Vec<_> = upcoming.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![soon.id, later.id], "soonest first, no past or cancelled");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_by_date_covers_the_whole_day(pool: PgPool) {
    let early = AppointmentRepo::create(&pool, &new_appointment("Early", at(2026, 9, 1, 0, 0)))
        .await
        .unwrap();
    let late = AppointmentRepo::create(&pool, &new_appointment("Late", at(2026, 9, 1, 23, 59)))
        .await
        .unwrap();
    AppointmentRepo::create(&pool, &new_appointment("Next day", at(2026, 9, 2, 0, 0)))
        .await
        .unwrap();

    let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
    let rows = AppointmentRepo::find_by_date(&pool, date).await.unwrap();
    let ids: Vec<_> = rows.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![early.id, late.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_update_validates_and_logs(pool: PgPool) {
    let appointment = AppointmentRepo::create(&pool, &new_appointment("Beratung", at(2026, 9, 1, 10, 0)))
        .await
        .unwrap();

    let err = AppointmentRepo::update_status(&pool, appointment.id, "DONE-ISH", None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));

    let updated = AppointmentRepo::update_status(&pool, appointment.id, "CONFIRMED", None)
        .await
        .unwrap();
    assert_eq!(updated.status, AppointmentStatus::Confirmed);

    let logs = ActivityLogRepo::find_by_entity(&pool, "appointment", appointment.id)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, "APPOINTMENT_STATUS_CHANGED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn notes_are_listed_newest_first(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("Alice", "alice@example.de"))
        .await
        .unwrap();
    let appointment = AppointmentRepo::create(&pool, &new_appointment("Beratung", at(2026, 9, 1, 10, 0)))
        .await
        .unwrap();

    for text in ["erste Notiz", "zweite Notiz"] {
        AppointmentRepo::add_note(
            &pool,
            &CreateAppointmentNote {
                appointment_id: appointment.id,
                user_id: user.id,
                user_name: user.name.clone(),
                text: text.to_string(),
            },
        )
        .await
        .unwrap();
    }

    let notes = AppointmentRepo::find_notes(&pool, appointment.id).await.unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].user_name, "Alice");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn nonpositive_duration_is_rejected(pool: PgPool) {
    let err = AppointmentRepo::create(
        &pool,
        &CreateAppointment {
            duration_minutes: Some(-30),
            ..new_appointment("Broken", at(2026, 9, 1, 10, 0))
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}
