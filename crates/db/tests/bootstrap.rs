//! Smoke tests: migrations apply, the pool is healthy, and an empty database
//! lists cleanly.

mod common;

use bms_db::pagination::ListParams;
use bms_db::repositories::CustomerRepo;
use bms_db::repository::Repository;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_check_succeeds(pool: PgPool) {
    bms_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_database_lists_cleanly(pool: PgPool) {
    let page = CustomerRepo::find_all(&pool, &ListParams::default())
        .await
        .unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.pagination.total, 0);
    assert_eq!(page.pagination.total_pages, 0);
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.limit, 10);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn all_tables_exist(pool: PgPool) {
    for table in [
        "users",
        "user_settings",
        "customers",
        "appointments",
        "contact_requests",
        "request_notes",
        "appointment_notes",
        "activity_logs",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {table} should exist after migration");
    }
}
