//! Status enums for the persisted entities.
//!
//! Statuses are stored as TEXT; each enum round-trips through its symbolic
//! name. `parse` rejects unknown values with a `Validation` error listing
//! the accepted set, which is what the repository layer surfaces when a
//! caller submits a status outside the enum.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

fn invalid(kind: &str, value: &str, allowed: &[&str]) -> CoreError {
    CoreError::validation(format!(
        "invalid {kind} '{value}'; expected one of: {}",
        allowed.join(", ")
    ))
}

// ---------------------------------------------------------------------------
// ContactRequest status
// ---------------------------------------------------------------------------

/// Lifecycle of an inbound contact request.
///
/// NEW -> IN_PROGRESS (assign/link) -> COMPLETED (conversion) or CANCELLED.
/// Once a request carries a `customer_id` it must never return to NEW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    New,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: &'static [&'static str] = &["NEW", "IN_PROGRESS", "COMPLETED", "CANCELLED"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(invalid("request status", other, Self::ALL)),
        }
    }
}

impl TryFrom<String> for RequestStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Customer status / type
// ---------------------------------------------------------------------------

/// DELETED is a soft delete: the row persists but is excluded from default
/// list, count, and search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,
    Inactive,
    Deleted,
}

impl CustomerStatus {
    pub const ALL: &'static [&'static str] = &["ACTIVE", "INACTIVE", "DELETED"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Deleted => "DELETED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "DELETED" => Ok(Self::Deleted),
            other => Err(invalid("customer status", other, Self::ALL)),
        }
    }
}

impl TryFrom<String> for CustomerStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerType {
    Private,
    Business,
}

impl CustomerType {
    pub const ALL: &'static [&'static str] = &["PRIVATE", "BUSINESS"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::Business => "BUSINESS",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "PRIVATE" => Ok(Self::Private),
            "BUSINESS" => Ok(Self::Business),
            other => Err(invalid("customer type", other, Self::ALL)),
        }
    }
}

impl TryFrom<String> for CustomerType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Appointment status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Planned,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: &'static [&'static str] = &["PLANNED", "CONFIRMED", "COMPLETED", "CANCELLED"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Confirmed => "CONFIRMED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "PLANNED" => Ok(Self::Planned),
            "CONFIRMED" => Ok(Self::Confirmed),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(invalid("appointment status", other, Self::ALL)),
        }
    }
}

impl TryFrom<String> for AppointmentStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// User status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub const ALL: &'static [&'static str] = &["ACTIVE", "INACTIVE"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            other => Err(invalid("user status", other, Self::ALL)),
        }
    }
}

impl TryFrom<String> for UserStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_status_round_trip() {
        for name in RequestStatus::ALL {
            assert_eq!(RequestStatus::parse(name).unwrap().as_str(), *name);
        }
    }

    #[test]
    fn request_status_rejects_unknown() {
        let err = RequestStatus::parse("DONE").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("DONE"), "message should echo the input: {msg}");
        assert!(msg.contains("IN_PROGRESS"), "message should list options");
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn appointment_status_rejects_lowercase() {
        assert!(AppointmentStatus::parse("planned").is_err());
    }

    #[test]
    fn customer_status_round_trip() {
        for name in CustomerStatus::ALL {
            assert_eq!(CustomerStatus::parse(name).unwrap().as_str(), *name);
        }
    }

    #[test]
    fn try_from_string_matches_parse() {
        let status: CustomerType = "BUSINESS".to_string().try_into().unwrap();
        assert_eq!(status, CustomerType::Business);
    }
}
