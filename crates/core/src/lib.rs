//! Domain core for the business-management system.
//!
//! Zero internal deps: the error taxonomy, shared ID/timestamp aliases,
//! status enums, and pure scheduling helpers live here so they can be used
//! by the data-access layer and any future worker or CLI tooling.

pub mod error;
pub mod scheduling;
pub mod status;
pub mod types;
