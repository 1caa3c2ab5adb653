use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use giveback_db::filter::RequestFilter;
use giveback_db::models::NewRequest;
use giveback_types::api::{
    AddImageRequest, Claims, CreateRequestRequest, DeleteResponse, RequestListQuery,
    RequestRecord, UpdateRequestRequest,
};

use crate::error::ApiError;
use crate::shape::request_record;
use crate::validate::validate_description;
use crate::{AppState, path_id, run_db};

/// GET /requests?author=&color=&size=: any combination, newest first.
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<Vec<RequestRecord>>, ApiError> {
    let filter = RequestFilter {
        author: query.author,
        color: query.color,
        size: query.size,
    };
    let found = run_db(&state, move |db| db.find_requests(&filter)).await?;
    Ok(Json(found.iter().map(request_record).collect()))
}

/// GET /users/{username}/requests
pub async fn list_user_requests(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<RequestRecord>>, ApiError> {
    let filter = RequestFilter {
        author: Some(username),
        ..Default::default()
    };
    let found = run_db(&state, move |db| db.find_requests(&filter)).await?;
    Ok(Json(found.iter().map(request_record).collect()))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestRecord>, ApiError> {
    let id = path_id(&request_id, "request")?;
    let found = run_db(&state, move |db| db.find_request(&id)).await?;
    Ok(Json(request_record(&found)))
}

pub async fn create_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_description(&req.description)?;

    let author_id = claims.sub.to_string();
    let created = run_db(&state, move |db| {
        let row = db.insert_request(NewRequest {
            author_id: &author_id,
            contact: &req.contact,
            description: &req.description,
            color: &req.color,
            size: &req.size,
        })?;
        db.find_request(&row.id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(request_record(&created))))
}

/// PATCH /requests/{id}: author only.
pub async fn update_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateRequestRequest>,
) -> Result<Json<RequestRecord>, ApiError> {
    let id = path_id(&request_id, "request")?;
    ensure_author(&state, &id, &claims).await?;
    validate_description(&req.description)?;

    let updated = run_db(&state, move |db| {
        db.update_request_description(&id, &req.description)?;
        db.find_request(&id)
    })
    .await?;

    info!("Request {} edited by {}", updated.request.id, claims.sub);
    Ok(Json(request_record(&updated)))
}

/// DELETE /requests/{id}: author only.
pub async fn delete_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = path_id(&request_id, "request")?;
    ensure_author(&state, &id, &claims).await?;

    let deleted = run_db(&state, move |db| db.delete_request(&id)).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// DELETE /requests/users/{user_id}: only for your own requests. Nothing
/// left to delete is still success.
pub async fn delete_user_requests(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = path_id(&user_id, "user")?;
    if id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("Cannot modify other users' requests."));
    }

    run_db(&state, move |db| db.delete_requests_by_author(&id)).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}

pub async fn get_images(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let id = path_id(&request_id, "request")?;
    let images = run_db(&state, move |db| db.get_request_images(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("request {}", request_id)))?;
    Ok(Json(images))
}

/// POST /requests/{id}/images: author only. Appends one URL.
pub async fn add_image(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddImageRequest>,
) -> Result<Json<RequestRecord>, ApiError> {
    let id = path_id(&request_id, "request")?;
    ensure_author(&state, &id, &claims).await?;

    let updated = run_db(&state, move |db| {
        db.append_request_image(&id, &req.image_url)?;
        db.find_request(&id)
    })
    .await?;

    Ok(Json(request_record(&updated)))
}

/// 404 if the request is gone, 403 if the caller did not write it.
async fn ensure_author(state: &AppState, id: &str, claims: &Claims) -> Result<(), ApiError> {
    let id = id.to_string();
    let found = run_db(state, move |db| db.find_request(&id)).await?;
    if found.request.author_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("Cannot modify other users' requests."));
    }
    Ok(())
}
