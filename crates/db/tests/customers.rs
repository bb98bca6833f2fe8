//! Customer repository: schema defaults, soft delete, search, and the
//! constraint-to-domain-error mapping.

mod common;

use assert_matches::assert_matches;
use bms_core::error::CoreError;
use bms_core::status::{CustomerStatus, CustomerType};
use bms_db::models::customer::{CreateCustomer, CustomerFilter, UpdateCustomer};
use bms_db::pagination::ListParams;
use bms_db::repositories::{ActivityLogRepo, CustomerRepo};
use bms_db::repository::Repository;
use common::new_customer;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_applies_schema_defaults(pool: PgPool) {
    let customer = CustomerRepo::create(&pool, &new_customer("Max Mustermann", "max@example.de"))
        .await
        .unwrap();

    assert_eq!(customer.country, "Deutschland");
    assert_eq!(customer.customer_type, CustomerType::Private);
    assert_eq!(customer.status, CustomerStatus::Active);
    assert!(!customer.newsletter);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_is_a_conflict(pool: PgPool) {
    CustomerRepo::create(&pool, &new_customer("Max", "max@example.de"))
        .await
        .unwrap();
    let err = CustomerRepo::create(&pool, &new_customer("Moritz", "max@example.de"))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Conflict(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_missing_row_is_not_found(pool: PgPool) {
    let err = CustomerRepo::update(
        &pool,
        9999,
        &UpdateCustomer {
            name: Some("Niemand".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, CoreError::NotFound(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_patches_only_provided_fields(pool: PgPool) {
    let customer = CustomerRepo::create(
        &pool,
        &CreateCustomer {
            city: Some("Berlin".to_string()),
            ..new_customer("Max", "max@example.de")
        },
    )
    .await
    .unwrap();

    let updated = CustomerRepo::update(
        &pool,
        customer.id,
        &UpdateCustomer {
            phone: Some("+49 30 99999".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.phone.as_deref(), Some("+49 30 99999"));
    assert_eq!(updated.city.as_deref(), Some("Berlin"));
    assert_eq!(updated.name, "Max");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn soft_delete_hides_row_from_listing_but_not_direct_lookup(pool: PgPool) {
    let customer = CustomerRepo::create(&pool, &new_customer("Max", "max@example.de"))
        .await
        .unwrap();

    let deleted = CustomerRepo::soft_delete(&pool, customer.id, None)
        .await
        .unwrap();
    assert!(deleted);

    let page = CustomerRepo::find_all(&pool, &ListParams::default())
        .await
        .unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.pagination.total, 0);

    let count = CustomerRepo::count(&pool, None).await.unwrap();
    assert_eq!(count, 0);

    // Direct lookup still resolves the row.
    let found = CustomerRepo::find_by_id(&pool, customer.id).await.unwrap();
    assert_eq!(found.unwrap().status, CustomerStatus::Deleted);

    // A second soft delete is a no-op.
    let again = CustomerRepo::soft_delete(&pool, customer.id, None)
        .await
        .unwrap();
    assert!(!again);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn search_excludes_deleted_rows(pool: PgPool) {
    let keep = CustomerRepo::create(
        &pool,
        &CreateCustomer {
            city: Some("Hamburg".to_string()),
            ..new_customer("Anna Arendt", "anna@example.de")
        },
    )
    .await
    .unwrap();
    let gone = CustomerRepo::create(
        &pool,
        &CreateCustomer {
            city: Some("Hamburg".to_string()),
            ..new_customer("Bernd Brecht", "bernd@example.de")
        },
    )
    .await
    .unwrap();
    CustomerRepo::soft_delete(&pool, gone.id, None).await.unwrap();

    let hits = CustomerRepo::search(&pool, "hamburg", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, keep.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_by_email_skips_deleted(pool: PgPool) {
    let customer = CustomerRepo::create(&pool, &new_customer("Max", "max@example.de"))
        .await
        .unwrap();
    CustomerRepo::soft_delete(&pool, customer.id, None)
        .await
        .unwrap();

    let found = CustomerRepo::find_by_email(&pool, "max@example.de")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn filter_with_explicit_status_sees_deleted(pool: PgPool) {
    let customer = CustomerRepo::create(&pool, &new_customer("Max", "max@example.de"))
        .await
        .unwrap();
    CustomerRepo::soft_delete(&pool, customer.id, None)
        .await
        .unwrap();

    let filter = CustomerFilter {
        status: Some(CustomerStatus::Deleted),
        ..Default::default()
    };
    let rows = CustomerRepo::find_by_criteria(&pool, &filter, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bulk_update_with_no_ids_is_a_noop(pool: PgPool) {
    let affected = CustomerRepo::bulk_update(
        &pool,
        &[],
        &UpdateCustomer {
            newsletter: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(affected, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bulk_update_patches_every_listed_row(pool: PgPool) {
    let a = CustomerRepo::create(&pool, &new_customer("A", "a@example.de"))
        .await
        .unwrap();
    let b = CustomerRepo::create(&pool, &new_customer("B", "b@example.de"))
        .await
        .unwrap();
    CustomerRepo::create(&pool, &new_customer("C", "c@example.de"))
        .await
        .unwrap();

    let affected = CustomerRepo::bulk_update(
        &pool,
        &[a.id, b.id],
        &UpdateCustomer {
            newsletter: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(affected, 2);

    let filter = CustomerFilter {
        newsletter: Some(true),
        ..Default::default()
    };
    let count = CustomerRepo::count(&pool, Some(&filter)).await.unwrap();
    assert_eq!(count, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bulk_update_honors_every_dto_field(pool: PgPool) {
    let a = CustomerRepo::create(&pool, &new_customer("A", "a@example.de"))
        .await
        .unwrap();
    let b = CustomerRepo::create(&pool, &new_customer("B", "b@example.de"))
        .await
        .unwrap();

    let affected = CustomerRepo::bulk_update(
        &pool,
        &[a.id, b.id],
        &UpdateCustomer {
            city: Some("Köln".to_string()),
            phone: Some("+49 221 0000".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(affected, 2);

    let reloaded = CustomerRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(reloaded.city.as_deref(), Some("Köln"));
    assert_eq!(reloaded.phone.as_deref(), Some("+49 221 0000"));
    assert_eq!(reloaded.name, "A", "untouched fields keep their value");
    assert_eq!(reloaded.email, "a@example.de");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn newsletter_change_is_logged(pool: PgPool) {
    let customer = CustomerRepo::create(&pool, &new_customer("Max", "max@example.de"))
        .await
        .unwrap();

    let updated = CustomerRepo::update_newsletter(&pool, customer.id, true, None)
        .await
        .unwrap();
    assert!(updated.newsletter);

    let logs = ActivityLogRepo::find_by_entity(&pool, "customer", customer.id)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, "NEWSLETTER_UPDATED");
}
