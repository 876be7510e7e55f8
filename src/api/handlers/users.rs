use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{parse_payload, valid_email, Credentials, User};
use crate::{
    api::{
        response::{json_response, ApiError},
        AppState,
    },
    auth::{authenticate_request, password::hash_password_blocking},
    store::{NewUser, StoreError},
};

async fn hash_for(state: &AppState, password: String) -> Result<String, ApiError> {
    let config = state.config();
    let hashed = hash_password_blocking(
        password,
        config.password_cost(),
        config.password_hash_timeout(),
    )
    .await?;
    Ok(hashed)
}

fn check_email(email: &str) -> Result<(), ApiError> {
    if valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid email"))
    }
}

#[utoipa::path(
    post,
    path= "/api/users",
    request_body = Credentials,
    responses (
        (status = 201, description = "Registration successful", body = User, content_type = "application/json"),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "User with the specified email already exists"),
    ),
    tag= "users"
)]
#[instrument(skip(state, payload))]
pub async fn create_user(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let credentials = parse_payload(payload)?;
    check_email(&credentials.email)?;

    let hashed_password = hash_for(&state, credentials.password).await?;

    let user = state
        .users
        .create_user(NewUser {
            email: credentials.email,
            hashed_password,
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict => {
                debug!("Email already registered");
                ApiError::new(StatusCode::CONFLICT, "Email already registered")
            }
            other => other.into(),
        })?;

    info!(user_id = %user.id, "User registered");

    Ok(json_response(StatusCode::CREATED, &User::from(user)))
}

#[utoipa::path(
    put,
    path= "/api/users",
    request_body = Credentials,
    responses (
        (status = 200, description = "Credentials replaced", body = User, content_type = "application/json"),
        (status = 400, description = "Invalid email or password"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 409, description = "Email belongs to another user"),
    ),
    security(("bearer" = [])),
    tag= "users"
)]
#[instrument(skip(state, headers, payload))]
pub async fn update_user(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user_id = authenticate_request(&headers, state.config().token_secret())?;

    let credentials = parse_payload(payload)?;
    check_email(&credentials.email)?;

    let hashed_password = hash_for(&state, credentials.password).await?;

    let user = state
        .users
        .update_credentials(user_id, &credentials.email, &hashed_password)
        .await
        .map_err(|err| match err {
            StoreError::Conflict => ApiError::new(StatusCode::CONFLICT, "Email already registered"),
            StoreError::NotFound => ApiError::unauthorized("Unauthorized"),
            other => other.into(),
        })?;

    info!(%user_id, "User credentials updated");

    Ok(json_response(StatusCode::OK, &User::from(user)))
}
