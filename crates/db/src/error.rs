//! Engine-error translation: the single place where `sqlx::Error` becomes a
//! domain error. Repository methods call [`map_db_error`] on every engine
//! failure so no raw driver error escapes this crate.

use bms_core::error::CoreError;

pub type DbResult<T> = Result<T, CoreError>;

/// Translate a sqlx error into the domain taxonomy.
///
/// - `RowNotFound` -> `NotFound`
/// - unique violation (23505) -> `Conflict`, constraint named
/// - foreign-key violation (23503) -> `Conflict`
/// - not-null / check / data errors (23502, 23514, 22xxx) -> `Validation`
/// - everything else -> `Database` with the engine code preserved
pub fn map_db_error(err: sqlx::Error) -> CoreError {
    match err {
        sqlx::Error::RowNotFound => CoreError::NotFound("requested record".to_string()),
        sqlx::Error::Database(db_err) => classify_database_error(db_err.as_ref()),
        sqlx::Error::PoolTimedOut => {
            CoreError::database(None, "timed out acquiring a database connection")
        }
        other => CoreError::database(None, other.to_string()),
    }
}

fn classify_database_error(err: &dyn sqlx::error::DatabaseError) -> CoreError {
    let code = err.code().map(|c| c.into_owned());
    let constraint = err.constraint().unwrap_or("unknown");

    match code.as_deref() {
        // Unique constraint violation. Constraints are named uq_* in the schema.
        Some("23505") => CoreError::conflict(format!(
            "duplicate value violates unique constraint {constraint}"
        )),
        // Foreign-key violation: either the row is still referenced or the
        // referenced row does not exist.
        Some("23503") => CoreError::conflict(format!(
            "operation violates foreign key constraint {constraint}"
        )),
        // Not-null and check violations are malformed input.
        Some("23502") | Some("23514") => CoreError::validation(err.message().to_string()),
        // Data exceptions (invalid text representation, range overflow, ...).
        Some(c) if c.starts_with("22") => CoreError::validation(err.message().to_string()),
        _ => CoreError::database(code, err.message().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_matches!(
            map_db_error(sqlx::Error::RowNotFound),
            CoreError::NotFound(_)
        );
    }

    #[test]
    fn pool_timeout_maps_to_database_error() {
        assert_matches!(
            map_db_error(sqlx::Error::PoolTimedOut),
            CoreError::Database { code: None, .. }
        );
    }
}
