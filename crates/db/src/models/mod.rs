//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches
//! - A filter struct implementing `CriteriaBuilder`

pub mod activity_log;
pub mod appointment;
pub mod contact_request;
pub mod customer;
pub mod user;
