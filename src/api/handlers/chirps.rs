use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::parse_payload;
use crate::{
    api::{
        response::{json_response, ApiError},
        AppState,
    },
    auth::{authenticate_request, authorize_ownership},
    store::{ChirpRecord, NewChirp, StoreError},
};

pub const MAX_CHIRP_LENGTH: usize = 140;

const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];
const CENSORED: &str = "****";

/// Replace profane words, matched case-insensitively on single spaces.
#[must_use]
pub fn clean_body(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if PROFANE_WORDS.contains(&word.to_lowercase().as_str()) {
                CENSORED
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ChirpRequest {
    body: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Chirp {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: Uuid,
}

impl From<ChirpRecord> for Chirp {
    fn from(record: ChirpRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            body: record.body,
            user_id: record.user_id,
        }
    }
}

#[derive(ToSchema, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ListChirpsArgs {
    /// Only chirps written by this user
    author_id: Option<Uuid>,
    /// Creation order, `asc` (default) or `desc`
    sort: Option<SortOrder>,
}

fn parse_chirp_id(chirp_id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(chirp_id.trim()).map_err(|_| ApiError::not_found("Chirp not found"))
}

#[utoipa::path(
    post,
    path= "/api/chirps",
    request_body = ChirpRequest,
    responses (
        (status = 201, description = "Chirp created", body = Chirp, content_type = "application/json"),
        (status = 400, description = "Chirp is too long"),
        (status = 401, description = "Missing or invalid access token"),
    ),
    security(("bearer" = [])),
    tag= "chirps"
)]
#[instrument(skip(state, headers, payload))]
pub async fn create_chirp(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChirpRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user_id = authenticate_request(&headers, state.config().token_secret())?;
    let request = parse_payload(payload)?;

    if request.body.chars().count() > MAX_CHIRP_LENGTH {
        return Err(ApiError::bad_request("Chirp is too long"));
    }

    let chirp = state
        .chirps
        .create_chirp(NewChirp {
            body: clean_body(&request.body),
            user_id,
        })
        .await?;

    info!(chirp_id = %chirp.id, %user_id, "Chirp created");

    Ok(json_response(StatusCode::CREATED, &Chirp::from(chirp)))
}

#[utoipa::path(
    get,
    path= "/api/chirps",
    params(ListChirpsArgs),
    responses (
        (status = 200, description = "Chirps", body = [Chirp], content_type = "application/json"),
        (status = 400, description = "Invalid author_id or sort"),
    ),
    tag= "chirps"
)]
#[instrument(skip(state, query))]
pub async fn list_chirps(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<ListChirpsArgs>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(args) = query.map_err(|rejection| {
        debug!("Rejected query: {rejection}");
        ApiError::bad_request("Invalid query parameters")
    })?;

    let mut chirps: Vec<Chirp> = state
        .chirps
        .list_chirps(args.author_id)
        .await?
        .into_iter()
        .map(Chirp::from)
        .collect();

    if args.sort.unwrap_or_default() == SortOrder::Desc {
        chirps.reverse();
    }

    Ok(json_response(StatusCode::OK, &chirps))
}

#[utoipa::path(
    get,
    path= "/api/chirps/{chirp_id}",
    params(("chirp_id" = String, Path, description = "Chirp id")),
    responses (
        (status = 200, description = "Chirp", body = Chirp, content_type = "application/json"),
        (status = 404, description = "Chirp not found"),
    ),
    tag= "chirps"
)]
#[instrument(skip(state))]
pub async fn get_chirp(
    Extension(state): Extension<Arc<AppState>>,
    Path(chirp_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_chirp_id(&chirp_id)?;

    let chirp = state
        .chirps
        .get_chirp(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chirp not found"))?;

    Ok(json_response(StatusCode::OK, &Chirp::from(chirp)))
}

#[utoipa::path(
    delete,
    path= "/api/chirps/{chirp_id}",
    params(("chirp_id" = String, Path, description = "Chirp id")),
    responses (
        (status = 204, description = "Chirp deleted"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Chirp belongs to another user"),
        (status = 404, description = "Chirp not found"),
    ),
    security(("bearer" = [])),
    tag= "chirps"
)]
#[instrument(skip(state, headers))]
pub async fn delete_chirp(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(chirp_id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = authenticate_request(&headers, state.config().token_secret())?;
    let id = parse_chirp_id(&chirp_id)?;

    let chirp = state
        .chirps
        .get_chirp(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chirp not found"))?;

    authorize_ownership(chirp.user_id, user_id)?;

    state.chirps.delete_chirp(id).await.map_err(|err| match err {
        StoreError::NotFound => ApiError::not_found("Chirp not found"),
        other => other.into(),
    })?;

    info!(chirp_id = %id, %user_id, "Chirp deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profanity_is_masked() {
        assert_eq!(
            clean_body("I had something interesting for breakfast"),
            "I had something interesting for breakfast"
        );
        assert_eq!(
            clean_body("I hear Mastodon is better than Chirpy. sharbert I need to migrate"),
            "I hear Mastodon is better than Chirpy. **** I need to migrate"
        );
        assert_eq!(
            clean_body("I really need a kerfuffle to go to bed sooner, Fornax !"),
            "I really need a **** to go to bed sooner, **** !"
        );
    }

    #[test]
    fn punctuation_keeps_word_intact() {
        assert_eq!(clean_body("Sharbert! kerfuffle."), "Sharbert! kerfuffle.");
    }
}
