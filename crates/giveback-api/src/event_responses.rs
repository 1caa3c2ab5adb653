use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use giveback_db::aggregate::ResponseScope;
use giveback_db::models::NewEventResponse;
use giveback_types::api::{Claims, CreateEventResponseRequest, DeleteResponse, EventResponseRecord};

use crate::error::ApiError;
use crate::events::ensure_coordinator;
use crate::shape::event_response_record;
use crate::validate::validate_description;
use crate::{AppState, path_id, run_db};

async fn list_scoped(
    state: &AppState,
    scope: ResponseScope,
) -> Result<Json<Vec<EventResponseRecord>>, ApiError> {
    let found = run_db(state, move |db| db.find_event_responses(&scope)).await?;
    Ok(Json(found.iter().map(event_response_record).collect()))
}

/// GET /eventResponses
pub async fn list_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponseRecord>>, ApiError> {
    list_scoped(&state, ResponseScope::All).await
}

/// GET /eventResponses/events/{event_id}: 404 for an unknown event.
pub async fn list_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<EventResponseRecord>>, ApiError> {
    let id = path_id(&event_id, "event")?;
    list_scoped(&state, ResponseScope::Event(id)).await
}

/// GET /eventResponses/users/{user_id}: 404 for an unknown user.
pub async fn list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<EventResponseRecord>>, ApiError> {
    let id = path_id(&user_id, "user")?;
    list_scoped(&state, ResponseScope::Author(id)).await
}

/// POST /eventResponses/events/{event_id}
pub async fn create_response(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventResponseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = path_id(&event_id, "event")?;
    validate_description(&req.description)?;

    let author_id = claims.sub.to_string();
    let created = run_db(&state, move |db| {
        // Existence check only; the store keeps no foreign key.
        db.find_event(&event_id)?;
        let row = db.insert_event_response(NewEventResponse {
            author_id: &author_id,
            event_id: &event_id,
            contact: &req.contact,
            description: &req.description,
        })?;
        db.find_event_response(&row.id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(event_response_record(&created))))
}

/// DELETE /eventResponses/{id}: author only.
pub async fn delete_response(
    State(state): State<AppState>,
    Path(response_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = path_id(&response_id, "response")?;

    let lookup = id.clone();
    let found = run_db(&state, move |db| db.find_event_response(&lookup)).await?;
    if found.response.author_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("Cannot delete other users' responses."));
    }

    let deleted = run_db(&state, move |db| db.delete_event_response(&id)).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// DELETE /eventResponses/events/{event_id}: event coordinator only.
pub async fn delete_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = path_id(&event_id, "event")?;
    ensure_coordinator(&state, &id, &claims).await?;

    let deleted = run_db(&state, move |db| db.delete_responses_by_event(&id)).await?;
    info!("Responses to event {} cleared by {}", event_id, claims.sub);
    Ok(Json(DeleteResponse { deleted }))
}

/// DELETE /eventResponses/users/{user_id}: only for your own responses.
pub async fn delete_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = path_id(&user_id, "user")?;
    if id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("Cannot delete other users' responses."));
    }

    let deleted = run_db(&state, move |db| db.delete_responses_by_author(&id)).await?;
    info!("Responses by {} cleared", claims.sub);
    Ok(Json(DeleteResponse { deleted }))
}
