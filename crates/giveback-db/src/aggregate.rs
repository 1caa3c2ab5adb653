//! Reference resolution and cascade deletes.
//!
//! Store rows carry bare author and event ids. The `find_*` operations
//! compile the caller's filter, run it, then batch-resolve every referenced
//! user and event so callers receive each row next to the records it points
//! at. Lists always come back newest first.

use std::collections::HashMap;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::filter::{EventFilter, Query, RequestFilter};
use crate::models::{EventResponseRow, EventRow, RequestRow, UserRow};
use crate::queries::{
    query_event_by_id, query_event_response_by_id, query_event_responses, query_events,
    query_events_by_ids, query_request_by_id, query_requests, query_user_by_id,
    query_users_by_ids,
};
use crate::{Database, DbError, Result};

#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub request: RequestRow,
    /// `None` when the author row no longer exists.
    pub author: Option<UserRow>,
}

#[derive(Debug, Clone)]
pub struct ResolvedEvent {
    pub event: EventRow,
    pub coordinator: Option<UserRow>,
}

#[derive(Debug, Clone)]
pub struct ResolvedEventResponse {
    pub response: EventResponseRow,
    pub author: Option<UserRow>,
    /// Responses hold a weak reference; the event may already be gone.
    pub event: Option<EventRow>,
}

/// Which event responses to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseScope {
    All,
    Event(String),
    Author(String),
}

impl ResponseScope {
    /// The scoped event or user must exist; an unknown key is `NotFound`,
    /// never an empty list.
    fn compile(&self, conn: &Connection) -> Result<Query> {
        match self {
            ResponseScope::All => Ok(Query::all()),
            ResponseScope::Event(event_id) => {
                query_event_by_id(conn, event_id)?
                    .ok_or_else(|| DbError::NotFound(format!("event {}", event_id)))?;
                Ok(Query::all().eq("event_id", event_id.as_str()))
            }
            ResponseScope::Author(user_id) => {
                query_user_by_id(conn, user_id)?
                    .ok_or_else(|| DbError::NotFound(format!("user {}", user_id)))?;
                Ok(Query::all().eq("author_id", user_id.as_str()))
            }
        }
    }
}

trait CreatedAt {
    fn created_at(&self) -> &str;
}

impl CreatedAt for ResolvedRequest {
    fn created_at(&self) -> &str {
        &self.request.created_at
    }
}

impl CreatedAt for ResolvedEvent {
    fn created_at(&self) -> &str {
        &self.event.created_at
    }
}

impl CreatedAt for ResolvedEventResponse {
    fn created_at(&self) -> &str {
        &self.response.created_at
    }
}

/// Stable, so rows sharing a timestamp keep the store's order.
fn sort_newest_first<T: CreatedAt>(items: &mut [T]) {
    items.sort_by(|a, b| b.created_at().cmp(a.created_at()));
}

fn resolve_users<'a>(
    conn: &Connection,
    ids: impl Iterator<Item = &'a String>,
) -> Result<HashMap<String, UserRow>> {
    let ids: Vec<String> = ids.cloned().collect();
    Ok(query_users_by_ids(conn, &ids)?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect())
}

fn resolve_events<'a>(
    conn: &Connection,
    ids: impl Iterator<Item = &'a String>,
) -> Result<HashMap<String, EventRow>> {
    let ids: Vec<String> = ids.cloned().collect();
    Ok(query_events_by_ids(conn, &ids)?
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect())
}

fn resolve_requests(conn: &Connection, rows: Vec<RequestRow>) -> Result<Vec<ResolvedRequest>> {
    let authors = resolve_users(conn, rows.iter().map(|r| &r.author_id))?;
    let mut resolved: Vec<ResolvedRequest> = rows
        .into_iter()
        .map(|request| ResolvedRequest {
            author: authors.get(&request.author_id).cloned(),
            request,
        })
        .collect();
    sort_newest_first(&mut resolved);
    Ok(resolved)
}

fn resolve_event_rows(conn: &Connection, rows: Vec<EventRow>) -> Result<Vec<ResolvedEvent>> {
    let coordinators = resolve_users(conn, rows.iter().map(|e| &e.coordinator_id))?;
    let mut resolved: Vec<ResolvedEvent> = rows
        .into_iter()
        .map(|event| ResolvedEvent {
            coordinator: coordinators.get(&event.coordinator_id).cloned(),
            event,
        })
        .collect();
    sort_newest_first(&mut resolved);
    Ok(resolved)
}

fn resolve_responses(
    conn: &Connection,
    rows: Vec<EventResponseRow>,
) -> Result<Vec<ResolvedEventResponse>> {
    let authors = resolve_users(conn, rows.iter().map(|r| &r.author_id))?;
    let events = resolve_events(conn, rows.iter().map(|r| &r.event_id))?;
    let mut resolved: Vec<ResolvedEventResponse> = rows
        .into_iter()
        .map(|response| ResolvedEventResponse {
            author: authors.get(&response.author_id).cloned(),
            event: events.get(&response.event_id).cloned(),
            response,
        })
        .collect();
    sort_newest_first(&mut resolved);
    Ok(resolved)
}

fn single<T>(mut resolved: Vec<T>, what: &str, id: &str) -> Result<T> {
    resolved
        .pop()
        .ok_or_else(|| DbError::NotFound(format!("{} {}", what, id)))
}

impl Database {
    // -- Requests --

    pub fn find_requests(&self, filter: &RequestFilter) -> Result<Vec<ResolvedRequest>> {
        self.with_conn(|conn| {
            let query = filter.compile(conn)?;
            let rows = query_requests(conn, &query)?;
            resolve_requests(conn, rows)
        })
    }

    pub fn find_request(&self, id: &str) -> Result<ResolvedRequest> {
        self.with_conn(|conn| {
            let rows = query_request_by_id(conn, id)?.into_iter().collect();
            single(resolve_requests(conn, rows)?, "request", id)
        })
    }

    // -- Events --

    pub fn find_events(&self, filter: &EventFilter) -> Result<Vec<ResolvedEvent>> {
        self.with_conn(|conn| {
            let query = filter.compile(conn)?;
            let rows = query_events(conn, &query)?;
            resolve_event_rows(conn, rows)
        })
    }

    pub fn find_event(&self, id: &str) -> Result<ResolvedEvent> {
        self.with_conn(|conn| {
            let rows = query_event_by_id(conn, id)?.into_iter().collect();
            single(resolve_event_rows(conn, rows)?, "event", id)
        })
    }

    // -- Event responses --

    pub fn find_event_responses(&self, scope: &ResponseScope) -> Result<Vec<ResolvedEventResponse>> {
        self.with_conn(|conn| {
            let query = scope.compile(conn)?;
            let rows = query_event_responses(conn, &query)?;
            resolve_responses(conn, rows)
        })
    }

    pub fn find_event_response(&self, id: &str) -> Result<ResolvedEventResponse> {
        self.with_conn(|conn| {
            let rows = query_event_response_by_id(conn, id)?.into_iter().collect();
            single(resolve_responses(conn, rows)?, "response", id)
        })
    }

    // -- Cascade deletes --

    /// Deletes every response to `event_id`. Zero matches is success.
    pub fn delete_responses_by_event(&self, event_id: &str) -> Result<bool> {
        self.cascade_responses(Query::all().eq("event_id", event_id), event_id)
    }

    /// Deletes every response written by `user_id`. Zero matches is success.
    pub fn delete_responses_by_author(&self, user_id: &str) -> Result<bool> {
        self.cascade_responses(Query::all().eq("author_id", user_id), user_id)
    }

    /// Deletes the event's responses, then the event. `Ok(false)` if the
    /// event did not exist, in which case no responses are touched. A partial
    /// cascade failure leaves the event in place so the whole call can be
    /// retried.
    pub fn delete_event_cascade(&self, event_id: &str) -> Result<bool> {
        if self.with_conn(|conn| query_event_by_id(conn, event_id))?.is_none() {
            return Ok(false);
        }
        self.delete_responses_by_event(event_id)?;
        self.delete_event(event_id)
    }

    /// List first, then delete each match by its own id under its own lock,
    /// so every deletion commits on its own. A failed delete does not stop
    /// the loop and nothing is rolled back; failures are reported once all
    /// ids have been attempted.
    fn cascade_responses(&self, query: Query, key: &str) -> Result<bool> {
        let ids: Vec<String> = self.with_conn(|conn| {
            Ok(query_event_responses(conn, &query)?
                .into_iter()
                .map(|r| r.id)
                .collect())
        })?;

        let attempted = ids.len();
        let mut deleted = 0;
        let mut failed = Vec::new();

        for id in ids {
            match self.delete_event_response(&id) {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Cascade delete of response {} failed: {}", id, e);
                    failed.push(id);
                }
            }
        }

        if failed.is_empty() {
            info!("Cascade deleted {} responses for {}", deleted, key);
            Ok(true)
        } else {
            Err(DbError::PartialFailure {
                attempted,
                deleted,
                failed,
            })
        }
    }
}
