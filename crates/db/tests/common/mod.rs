//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use bms_db::models::appointment::CreateAppointment;
use bms_db::models::contact_request::CreateContactRequest;
use bms_db::models::customer::CreateCustomer;
use bms_db::models::user::CreateUser;
use chrono::{TimeZone, Utc};

use bms_core::types::Timestamp;

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn new_user(name: &str, email: &str) -> CreateUser {
    CreateUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$test-hash".to_string(),
        role: None,
    }
}

pub fn new_customer(name: &str, email: &str) -> CreateCustomer {
    CreateCustomer {
        name: name.to_string(),
        email: email.to_string(),
        ..Default::default()
    }
}

pub fn new_request(name: &str, email: &str, service: &str) -> CreateContactRequest {
    CreateContactRequest {
        name: name.to_string(),
        email: email.to_string(),
        phone: Some("+49 30 123456".to_string()),
        service: service.to_string(),
        message: "Bitte um Rückruf.".to_string(),
        created_by: None,
    }
}

pub fn new_appointment(title: &str, date: Timestamp) -> CreateAppointment {
    CreateAppointment {
        title: title.to_string(),
        appointment_date: date,
        ..Default::default()
    }
}
