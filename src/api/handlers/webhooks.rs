use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::parse_payload;
use crate::{
    api::{response::ApiError, AppState},
    auth::authorize_service_call,
    store::StoreError,
};

pub const USER_UPGRADED: &str = "user.upgraded";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct WebhookData {
    user_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PolkaEvent {
    event: String,
    data: WebhookData,
}

#[utoipa::path(
    post,
    path= "/api/polka/webhooks",
    request_body = PolkaEvent,
    responses (
        (status = 204, description = "Event handled or ignored"),
        (status = 400, description = "Malformed event"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Unknown user"),
    ),
    security(("api_key" = [])),
    tag= "webhooks"
)]
#[instrument(skip(state, headers, payload))]
pub async fn polka_webhook(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<PolkaEvent>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize_service_call(&headers, state.config().service_key())?;

    let event = parse_payload(payload)?;
    if event.event != USER_UPGRADED {
        debug!(event = %event.event, "Ignoring webhook event");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let user_id = Uuid::parse_str(event.data.user_id.trim())
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    state
        .users
        .upgrade_to_chirpy_red(user_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => ApiError::not_found("Invalid user ID"),
            other => other.into(),
        })?;

    info!(%user_id, "User upgraded to Chirpy Red");

    Ok(StatusCode::NO_CONTENT.into_response())
}
