//! Resolved store rows → client records.
//!
//! Records expose usernames instead of author ids and render `created_at`
//! for display. Ids leave the server only in canonical UUID form.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use giveback_db::aggregate::{ResolvedEvent, ResolvedEventResponse, ResolvedRequest};
use giveback_db::models::UserRow;
use giveback_types::api::{EventRecord, EventResponseRecord, RequestRecord};

/// Shown when the referenced user row is gone.
pub const DELETED_USER: &str = "[deleted]";

pub fn request_record(resolved: &ResolvedRequest) -> RequestRecord {
    let request = &resolved.request;
    RequestRecord {
        id: external_id(&request.id),
        author: display_name(resolved.author.as_ref()),
        contact: request.contact.clone(),
        description: request.description.clone(),
        color: request.color.clone(),
        size: request.size.clone(),
        date_created: display_timestamp(&request.created_at),
        images: request.images.clone(),
    }
}

pub fn event_record(resolved: &ResolvedEvent) -> EventRecord {
    let event = &resolved.event;
    EventRecord {
        id: external_id(&event.id),
        coordinator: display_name(resolved.coordinator.as_ref()),
        description: event.description.clone(),
        location: event.location.clone(),
        start_date: event.start_date.clone(),
        end_date: event.end_date.clone(),
        date_created: display_timestamp(&event.created_at),
    }
}

pub fn event_response_record(resolved: &ResolvedEventResponse) -> EventResponseRecord {
    let response = &resolved.response;
    let event_id = resolved
        .event
        .as_ref()
        .map_or(response.event_id.as_str(), |e| e.id.as_str());

    EventResponseRecord {
        id: external_id(&response.id),
        author: display_name(resolved.author.as_ref()),
        event_id: external_id(event_id),
        contact: response.contact.clone(),
        description: response.description.clone(),
        date_created: display_timestamp(&response.created_at),
    }
}

fn display_name(user: Option<&UserRow>) -> String {
    user.map_or_else(|| DELETED_USER.to_string(), |u| u.username.clone())
}

/// Canonical hyphenated form of a stored id.
pub fn external_id(raw: &str) -> String {
    match raw.parse::<Uuid>() {
        Ok(id) => id.hyphenated().to_string(),
        Err(e) => {
            warn!("Corrupt id '{}': {}", raw, e);
            raw.to_string()
        }
    }
}

/// Parses an id from a path segment. Anything that is not a UUID cannot name
/// a stored record, so callers treat `None` as not found.
pub fn parse_external_id(raw: &str) -> Option<String> {
    raw.parse::<Uuid>().ok().map(|id| id.hyphenated().to_string())
}

/// `"November 20th 2022, 8:05:00 am"`, in UTC.
pub fn display_timestamp(created_at: &str) -> String {
    let parsed = DateTime::parse_from_rfc3339(created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite datetime('now') form, no timezone.
            NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        });

    match parsed {
        Ok(dt) => format!(
            "{} {}{} {}, {}",
            dt.format("%B"),
            dt.day(),
            ordinal_suffix(dt.day()),
            dt.year(),
            dt.format("%-I:%M:%S %P"),
        ),
        Err(e) => {
            warn!("Corrupt created_at '{}': {}", created_at, e);
            created_at.to_string()
        }
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
