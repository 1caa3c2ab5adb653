use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{info, warn};

use crate::filter::Query;
use crate::models::{
    EventResponseRow, EventRow, NewEvent, NewEventResponse, NewRequest, RequestRow, UserRow,
    format_timestamp, new_id,
};
use crate::{Database, Result};

const USER_COLUMNS: &str = "id, username, created_at";
const REQUEST_COLUMNS: &str = "id, author_id, contact, description, color, size, images, created_at";
const EVENT_COLUMNS: &str =
    "id, coordinator_id, description, location, start_date, end_date, created_at";
const EVENT_RESPONSE_COLUMNS: &str =
    "id, author_id, event_id, contact, description, created_at";

impl Database {
    // -- Users --

    /// Mirror a verified identity. A changed username overwrites the old one.
    ///
    /// Usernames are unique, but the token issuer may hand a name to a new
    /// subject while an older mirror row still holds it. The stale row is
    /// renamed to `<name>#<id>` in the same transaction so the current holder
    /// always gets the plain name.
    pub fn upsert_user(&self, id: &str, username: &str) -> Result<()> {
        let now = format_timestamp(Utc::now());
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let released = tx.execute(
                "UPDATE users SET username = username || '#' || id
                 WHERE username = ?1 AND id != ?2",
                (username, id),
            )?;
            tx.execute(
                "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET username = excluded.username",
                (id, username, &now),
            )?;
            tx.commit()?;

            if released > 0 {
                warn!("Username {} moved to user {}", username, id);
            }
            Ok(())
        })
    }

    // -- Requests --

    pub fn insert_request(&self, new: NewRequest<'_>) -> Result<RequestRow> {
        self.insert_request_at(new, Utc::now())
    }

    pub(crate) fn insert_request_at(
        &self,
        new: NewRequest<'_>,
        at: DateTime<Utc>,
    ) -> Result<RequestRow> {
        let row = RequestRow {
            id: new_id(),
            author_id: new.author_id.to_string(),
            contact: new.contact.to_string(),
            description: new.description.to_string(),
            color: new.color.to_string(),
            size: new.size.to_string(),
            images: Vec::new(),
            created_at: format_timestamp(at),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO requests (id, author_id, contact, description, color, size, images, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, '[]', ?7)",
                rusqlite::params![
                    row.id,
                    row.author_id,
                    row.contact,
                    row.description,
                    row.color,
                    row.size,
                    row.created_at
                ],
            )?;
            Ok(())
        })?;

        info!("Request {} created by {}", row.id, row.author_id);
        Ok(row)
    }

    pub fn get_request(&self, id: &str) -> Result<Option<RequestRow>> {
        self.with_conn(|conn| query_request_by_id(conn, id))
    }

    /// Returns `None` when no request has this id.
    pub fn update_request_description(
        &self,
        id: &str,
        description: &str,
    ) -> Result<Option<RequestRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE requests SET description = ?1 WHERE id = ?2",
                (description, id),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_request_by_id(conn, id)
        })
    }

    /// Read-modify-write of the whole `images` array. Two concurrent appends
    /// issued through different connections can lose one of the URLs.
    pub fn append_request_image(&self, id: &str, url: &str) -> Result<Option<RequestRow>> {
        self.with_conn(|conn| {
            let Some(mut request) = query_request_by_id(conn, id)? else {
                return Ok(None);
            };
            request.images.push(url.to_string());

            let images = serde_json::to_string(&request.images)
                .map_err(|e| crate::DbError::CorruptRow(e.to_string()))?;
            conn.execute(
                "UPDATE requests SET images = ?1 WHERE id = ?2",
                (&images, id),
            )?;
            Ok(Some(request))
        })
    }

    pub fn get_request_images(&self, id: &str) -> Result<Option<Vec<String>>> {
        Ok(self.get_request(id)?.map(|r| r.images))
    }

    /// `false` when nothing matched; calling again gives the same answer.
    pub fn delete_request(&self, id: &str) -> Result<bool> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM requests WHERE id = ?1", [id])?)
        })?;
        if deleted > 0 {
            info!("Request {} deleted", id);
        }
        Ok(deleted > 0)
    }

    /// Removes every request by `author_id` and returns how many went.
    pub fn delete_requests_by_author(&self, author_id: &str) -> Result<usize> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM requests WHERE author_id = ?1", [author_id])?)
        })?;
        info!("Deleted {} requests by {}", deleted, author_id);
        Ok(deleted)
    }

    // -- Events --

    pub fn insert_event(&self, new: NewEvent<'_>) -> Result<EventRow> {
        self.insert_event_at(new, Utc::now())
    }

    pub(crate) fn insert_event_at(&self, new: NewEvent<'_>, at: DateTime<Utc>) -> Result<EventRow> {
        let row = EventRow {
            id: new_id(),
            coordinator_id: new.coordinator_id.to_string(),
            description: new.description.to_string(),
            location: new.location.to_string(),
            start_date: new.start_date.to_string(),
            end_date: new.end_date.to_string(),
            created_at: format_timestamp(at),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, coordinator_id, description, location, start_date, end_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    row.id,
                    row.coordinator_id,
                    row.description,
                    row.location,
                    row.start_date,
                    row.end_date,
                    row.created_at
                ],
            )?;
            Ok(())
        })?;

        info!("Event {} created by {}", row.id, row.coordinator_id);
        Ok(row)
    }

    /// Removes the event only. Its responses stay until a cascade runs.
    pub fn delete_event(&self, id: &str) -> Result<bool> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM events WHERE id = ?1", [id])?)
        })?;
        if deleted > 0 {
            info!("Event {} deleted", id);
        }
        Ok(deleted > 0)
    }

    // -- Event responses --

    pub fn insert_event_response(&self, new: NewEventResponse<'_>) -> Result<EventResponseRow> {
        self.insert_event_response_at(new, Utc::now())
    }

    pub(crate) fn insert_event_response_at(
        &self,
        new: NewEventResponse<'_>,
        at: DateTime<Utc>,
    ) -> Result<EventResponseRow> {
        let row = EventResponseRow {
            id: new_id(),
            author_id: new.author_id.to_string(),
            event_id: new.event_id.to_string(),
            contact: new.contact.to_string(),
            description: new.description.to_string(),
            created_at: format_timestamp(at),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO event_responses (id, author_id, event_id, contact, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    row.id,
                    row.author_id,
                    row.event_id,
                    row.contact,
                    row.description,
                    row.created_at
                ],
            )?;
            Ok(())
        })?;

        info!("Response {} to event {} created by {}", row.id, row.event_id, row.author_id);
        Ok(row)
    }

    pub fn delete_event_response(&self, id: &str) -> Result<bool> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM event_responses WHERE id = ?1", [id])?)
        })?;
        if deleted > 0 {
            info!("Response {} deleted", id);
        }
        Ok(deleted > 0)
    }
}

// -- Row mapping --

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<RequestRow> {
    let images: String = row.get(6)?;
    let images: Vec<String> = serde_json::from_str(&images)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(RequestRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        contact: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        size: row.get(5)?,
        images,
        created_at: row.get(7)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        coordinator_id: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn event_response_from_row(row: &Row<'_>) -> rusqlite::Result<EventResponseRow> {
    Ok(EventResponseRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        event_id: row.get(2)?,
        contact: row.get(3)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
    })
}

// -- Connection-level queries, shared with the filter compiler and aggregator --

pub(crate) fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    Ok(conn.query_row(&sql, [username], user_from_row).optional()?)
}

pub(crate) fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

pub(crate) fn query_users_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<UserRow>> {
    select_by_ids(conn, "users", USER_COLUMNS, ids, user_from_row)
}

pub(crate) fn query_request_by_id(conn: &Connection, id: &str) -> Result<Option<RequestRow>> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], request_from_row).optional()?)
}

pub(crate) fn query_requests(conn: &Connection, query: &Query) -> Result<Vec<RequestRow>> {
    select_matching(conn, "requests", REQUEST_COLUMNS, query, request_from_row)
}

pub(crate) fn query_event_by_id(conn: &Connection, id: &str) -> Result<Option<EventRow>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], event_from_row).optional()?)
}

pub(crate) fn query_events_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<EventRow>> {
    select_by_ids(conn, "events", EVENT_COLUMNS, ids, event_from_row)
}

pub(crate) fn query_events(conn: &Connection, query: &Query) -> Result<Vec<EventRow>> {
    select_matching(conn, "events", EVENT_COLUMNS, query, event_from_row)
}

pub(crate) fn query_event_response_by_id(
    conn: &Connection,
    id: &str,
) -> Result<Option<EventResponseRow>> {
    let sql = format!("SELECT {EVENT_RESPONSE_COLUMNS} FROM event_responses WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], event_response_from_row).optional()?)
}

pub(crate) fn query_event_responses(
    conn: &Connection,
    query: &Query,
) -> Result<Vec<EventResponseRow>> {
    select_matching(
        conn,
        "event_responses",
        EVENT_RESPONSE_COLUMNS,
        query,
        event_response_from_row,
    )
}

/// Every list read goes through here, so every list is newest first.
fn select_matching<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    query: &Query,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let (where_sql, params) = query.where_sql();
    let sql = format!("SELECT {columns} FROM {table}{where_sql} ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// SQLite caps bound parameters per statement; batch lookups stay well under.
const IDS_PER_STATEMENT: usize = 500;

/// Batch-fetch rows for a set of ids. Duplicate ids are collapsed and large
/// sets are split across several `IN` statements.
fn select_by_ids<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    ids: &[String],
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut seen = HashSet::new();
    let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

    let mut rows = Vec::with_capacity(unique.len());
    for chunk in unique.chunks(IDS_PER_STATEMENT) {
        let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT {columns} FROM {table} WHERE id IN ({})",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = chunk.iter().map(|id| *id as &dyn ToSql).collect();
        let batch = stmt
            .query_map(params.as_slice(), map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.extend(batch);
    }

    Ok(rows)
}
