use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    api::{
        response::{json_response, ApiError},
        AppState,
    },
    auth::{extract_bearer, AuthError},
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccessToken {
    token: String,
}

#[utoipa::path(
    post,
    path= "/api/refresh",
    responses (
        (status = 200, description = "New access token", body = AccessToken, content_type = "application/json"),
        (status = 401, description = "Refresh token missing, unknown, expired or revoked"),
    ),
    security(("bearer" = [])),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let refresh_token = extract_bearer(&headers).map_err(AuthError::from)?;
    let token = state.sessions.renew_access(refresh_token).await?;

    Ok(json_response(StatusCode::OK, &AccessToken { token }))
}

#[utoipa::path(
    post,
    path= "/api/revoke",
    responses (
        (status = 204, description = "Refresh token revoked"),
        (status = 401, description = "Refresh token missing or unknown"),
    ),
    security(("bearer" = [])),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn revoke(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let refresh_token = extract_bearer(&headers).map_err(AuthError::from)?;
    state.sessions.end_session(refresh_token).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
