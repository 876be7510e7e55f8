//! JSON responses and the error type handlers return.
//!
//! Every body goes through [`json_response`]. If serialization fails the
//! client gets [`ENCODE_FAILURE_BODY`], a fixed payload that needs no
//! encoding, so the error path cannot fail again.

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::{
    auth::{AuthError, PasswordError, RefreshError},
    store::StoreError,
};

pub const ENCODE_FAILURE_BODY: &str = r#"{"error":"Server failed to encode response"}"#;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

fn with_json_body(status: StatusCode, body: impl IntoResponse) -> Response {
    (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

/// Serialize `payload` with `status`.
pub fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> Response {
    match serde_json::to_vec(payload) {
        Ok(body) => with_json_body(status, body),
        Err(err) => {
            error!("Failed to encode response: {err}");
            with_json_body(StatusCode::INTERNAL_SERVER_ERROR, ENCODE_FAILURE_BODY)
        }
    }
}

/// `{"error": message}` with `status`.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    json_response(
        status,
        &ErrorBody {
            error: message.into(),
        },
    )
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.status, self.message)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            error!(reason = err.reason(), "Authorization failed: {err}");
        } else {
            debug!(reason = err.reason(), "Request rejected: {err}");
        }

        let message = match &err {
            AuthError::Credentials(_) => "Malformed request",
            AuthError::InvalidServiceKey => "Authentication failure",
            AuthError::Forbidden => "Action not permitted",
            AuthError::Refresh(RefreshError::NotFound) => "Token not found",
            AuthError::Refresh(RefreshError::Expired) => "Token expired",
            AuthError::Refresh(RefreshError::Revoked) => "Token revoked",
            _ if status.is_server_error() => "Server failed to authorize token",
            AuthError::Token(_) | AuthError::Refresh(_) => "Unauthorized",
        };

        Self::new(status, message)
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::EmptyInput | PasswordError::InputTooLong { .. } => {
                Self::bad_request(format!("Could not hash password: {err}"))
            }
            PasswordError::Mismatch => Self::unauthorized("Incorrect email or password"),
            PasswordError::Timeout => {
                error!("Password hashing timed out");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Server is busy, try again")
            }
            PasswordError::Hash(message) => {
                error!("Password hashing failed: {message}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Could not hash password")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found("Not found"),
            StoreError::Conflict => Self::new(StatusCode::CONFLICT, "Already exists"),
            StoreError::Database(err) => {
                error!("Database error: {err}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server failed to access storage")
            }
        }
    }
}
