use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use giveback_types::api::Claims;

use crate::error::ApiError;
use crate::{AppState, run_db};

/// Validate the bearer token, mirror the identity into the users table and
/// hand the claims to handlers as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?
    .claims;

    let user_id = claims.sub.to_string();
    let username = claims.username.clone();
    run_db(&state, move |db| db.upsert_user(&user_id, &username)).await?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
