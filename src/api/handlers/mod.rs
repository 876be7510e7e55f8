pub mod chirps;
pub mod health;
pub mod login;
pub mod tokens;
pub mod users;
pub mod webhooks;

// common types and checks for the handlers
use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use super::response::ApiError;
use crate::store::UserRecord;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Unwrap a JSON body or answer 400.
pub fn parse_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!("Rejected request body: {rejection}");
        ApiError::bad_request("Something went wrong")
    })
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct Credentials {
    email: String,
    password: String,
}

/// A user as returned to clients. Never carries the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            email: record.email,
            is_chirpy_red: record.is_chirpy_red,
        }
    }
}
