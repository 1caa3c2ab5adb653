pub mod error;
pub mod event_responses;
pub mod events;
pub mod middleware;
pub mod requests;
pub mod shape;
pub mod validate;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get},
};
use tracing::error;

use giveback_db::Database;

use crate::error::ApiError;
use crate::middleware::require_auth;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Every route except `/health` requires a bearer token.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/requests",
            get(requests::list_requests).post(requests::create_request),
        )
        .route(
            "/requests/{request_id}",
            get(requests::get_request)
                .patch(requests::update_request)
                .delete(requests::delete_request),
        )
        .route(
            "/requests/{request_id}/images",
            get(requests::get_images).post(requests::add_image),
        )
        .route(
            "/requests/users/{user_id}",
            delete(requests::delete_user_requests),
        )
        .route("/users/{username}/requests", get(requests::list_user_requests))
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/{event_id}",
            get(events::get_event).delete(events::delete_event),
        )
        .route("/eventResponses", get(event_responses::list_all))
        .route(
            "/eventResponses/events/{event_id}",
            get(event_responses::list_by_event)
                .post(event_responses::create_response)
                .delete(event_responses::delete_by_event),
        )
        .route(
            "/eventResponses/users/{user_id}",
            get(event_responses::list_by_user).delete(event_responses::delete_by_user),
        )
        .route(
            "/eventResponses/{response_id}",
            delete(event_responses::delete_response),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Runs a store call on the blocking pool.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> giveback_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

/// Path ids that are not UUIDs cannot exist in the store.
pub(crate) fn path_id(raw: &str, what: &str) -> Result<String, ApiError> {
    shape::parse_external_id(raw).ok_or_else(|| ApiError::NotFound(format!("{} {}", what, raw)))
}
