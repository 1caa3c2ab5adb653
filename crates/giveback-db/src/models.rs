//! Database row types: these map directly to SQLite rows.
//! Distinct from giveback-types API records to keep the DB layer independent.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRow {
    pub id: String,
    pub author_id: String,
    pub contact: String,
    pub description: String,
    pub color: String,
    pub size: String,
    pub images: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub id: String,
    pub coordinator_id: String,
    pub description: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventResponseRow {
    pub id: String,
    pub author_id: String,
    pub event_id: String,
    pub contact: String,
    pub description: String,
    pub created_at: String,
}

// -- Insert payloads --

#[derive(Debug, Clone, Copy)]
pub struct NewRequest<'a> {
    pub author_id: &'a str,
    pub contact: &'a str,
    pub description: &'a str,
    pub color: &'a str,
    pub size: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct NewEvent<'a> {
    pub coordinator_id: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub struct NewEventResponse<'a> {
    pub author_id: &'a str,
    pub event_id: &'a str,
    pub contact: &'a str,
    pub description: &'a str,
}

/// Storage form of `created_at`. Fixed width, so text order is time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
