use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use giveback_db::filter::EventFilter;
use giveback_db::models::NewEvent;
use giveback_types::api::{Claims, CreateEventRequest, DeleteResponse, EventListQuery, EventRecord};

use crate::error::ApiError;
use crate::shape::event_record;
use crate::validate::validate_description;
use crate::{AppState, path_id, run_db};

/// GET /events?coordinator=&location=&startrange=&endrange=
///
/// `startrange` and `endrange` only filter together; either one alone is
/// ignored.
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let filter = EventFilter {
        coordinator: query.coordinator,
        location: query.location,
        start_range: query.startrange,
        end_range: query.endrange,
    };
    let found = run_db(&state, move |db| db.find_events(&filter)).await?;
    Ok(Json(found.iter().map(event_record).collect()))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<EventRecord>, ApiError> {
    let id = path_id(&event_id, "event")?;
    let found = run_db(&state, move |db| db.find_event(&id)).await?;
    Ok(Json(event_record(&found)))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_description(&req.description)?;

    let coordinator_id = claims.sub.to_string();
    let created = run_db(&state, move |db| {
        let row = db.insert_event(NewEvent {
            coordinator_id: &coordinator_id,
            description: &req.description,
            location: &req.location,
            start_date: req.start_date,
            end_date: req.end_date,
        })?;
        db.find_event(&row.id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(event_record(&created))))
}

/// DELETE /events/{id}: coordinator only. Removes the event and then every
/// response to it.
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = path_id(&event_id, "event")?;
    ensure_coordinator(&state, &id, &claims).await?;

    let deleted = run_db(&state, move |db| db.delete_event_cascade(&id)).await?;
    info!("Event {} deleted by {}", event_id, claims.sub);
    Ok(Json(DeleteResponse { deleted }))
}

/// 404 if the event is gone, 403 if the caller does not coordinate it.
pub(crate) async fn ensure_coordinator(
    state: &AppState,
    id: &str,
    claims: &Claims,
) -> Result<(), ApiError> {
    let id = id.to_string();
    let found = run_db(state, move |db| db.find_event(&id)).await?;
    if found.event.coordinator_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("Cannot modify other users' events."));
    }
    Ok(())
}
