use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{parse_payload, Credentials};
use crate::{
    api::{
        response::{json_response, ApiError},
        AppState,
    },
    auth::{password::verify_password_blocking, PasswordError},
};

const LOGIN_FAILED: &str = "Incorrect email or password";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    email: String,
    is_chirpy_red: bool,
    token: String,
    refresh_token: String,
}

#[utoipa::path(
    post,
    path= "/api/login",
    request_body = Credentials,
    responses (
        (status = 200, description = "Login successful", body = LoginResponse, content_type = "application/json"),
        (status = 401, description = "Incorrect email or password"),
    ),
    tag= "auth"
)]
#[instrument(skip(state, payload))]
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let credentials = parse_payload(payload)?;

    let Some(user) = state.users.get_user_by_email(&credentials.email).await? else {
        debug!("Login for unknown email");
        let decoy = state.decoy_hash().await?.to_string();
        let _ = verify_password_blocking(
            credentials.password,
            decoy,
            state.config().password_hash_timeout(),
        )
        .await;
        return Err(ApiError::unauthorized(LOGIN_FAILED));
    };

    match verify_password_blocking(
        credentials.password,
        user.hashed_password.clone(),
        state.config().password_hash_timeout(),
    )
    .await
    {
        Ok(()) => {}
        Err(PasswordError::Mismatch) => {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(ApiError::unauthorized(LOGIN_FAILED));
        }
        Err(err) => return Err(err.into()),
    }

    let session = state.sessions.issue_session(user.id).await?;

    Ok(json_response(
        StatusCode::OK,
        &LoginResponse {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email,
            is_chirpy_red: user.is_chirpy_red,
            token: session.access_token,
            refresh_token: session.refresh_token,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::AuthConfig, store::MemoryStore};
    use secrecy::SecretString;

    fn state() -> Arc<AppState> {
        let config = AuthConfig::new(
            SecretString::from("login-test-secret".to_string()),
            SecretString::from("login-test-key".to_string()),
        )
        .with_password_cost(4);
        Arc::new(AppState::new(config, Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn unknown_email_still_checks_a_password() -> Result<(), Box<dyn std::error::Error>> {
        let state = state();
        let payload = Json(Credentials {
            email: "ghost@example.com".to_string(),
            password: "whatever".to_string(),
        });

        let err = login(Extension(state.clone()), Ok(payload))
            .await
            .err()
            .ok_or("login for an unknown email succeeded")?;
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), LOGIN_FAILED);

        let decoy = state.decoy_hash().await?;
        assert!(decoy.starts_with("$2"));
        assert!(matches!(
            verify_password_blocking(
                "whatever".to_string(),
                decoy.to_string(),
                std::time::Duration::from_secs(10)
            )
            .await,
            Err(PasswordError::Mismatch)
        ));
        Ok(())
    }
}
