//! Repository layer.
//!
//! Each repository is a zero-sized struct implementing the generic
//! [`Repository`](crate::repository::Repository) contract plus its
//! entity-specific methods, all accepting `&PgPool` (or a transaction
//! handle) as the first argument.

pub mod activity_log_repo;
pub mod appointment_repo;
pub mod customer_repo;
pub mod request_repo;
pub mod user_repo;

pub use activity_log_repo::ActivityLogRepo;
pub use appointment_repo::AppointmentRepo;
pub use customer_repo::CustomerRepo;
pub use request_repo::RequestRepo;
pub use user_repo::UserRepo;
