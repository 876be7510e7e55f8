use crate::store::StoreError;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password is empty")]
    EmptyInput,
    #[error("password is {len} bytes, limit is {max}")]
    InputTooLong { len: usize, max: usize },
    #[error("password does not match")]
    Mismatch,
    #[error("password hashing timed out")]
    Timeout,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("authorization header missing")]
    Missing,
    #[error("authorization header malformed")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    WrongIssuer,
    #[error("invalid subject")]
    BadSubject,
    #[error("signing key rejected")]
    InvalidKey,
    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("refresh token not found")]
    NotFound,
    #[error("refresh token expired")]
    Expired,
    #[error("refresh token revoked")]
    Revoked,
    #[error("failed to generate refresh token: {0}")]
    Generate(#[from] rand::Error),
    #[error("refresh token storage failure: {0}")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for RefreshError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

/// Failure of a composed authorization check.
///
/// Callers map these to their own responses, but the underlying kind stays
/// visible through [`AuthError::reason`] so logs can tell an expired token
/// from a forged one.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Credentials(#[from] ExtractError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Refresh(#[from] RefreshError),
    #[error("invalid service key")]
    InvalidServiceKey,
    #[error("action not permitted")]
    Forbidden,
}

impl AuthError {
    /// Stable, distinct label per failure kind.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Credentials(ExtractError::Missing) => "credentials_missing",
            Self::Credentials(ExtractError::Malformed) => "credentials_malformed",
            Self::Token(TokenError::Malformed) => "access_token_malformed",
            Self::Token(TokenError::BadSignature) => "access_token_bad_signature",
            Self::Token(TokenError::Expired) => "access_token_expired",
            Self::Token(TokenError::WrongIssuer) => "access_token_wrong_issuer",
            Self::Token(TokenError::BadSubject) => "access_token_bad_subject",
            Self::Token(TokenError::InvalidKey) => "access_token_invalid_key",
            Self::Token(TokenError::Encode(_)) => "access_token_encode_failed",
            Self::Refresh(RefreshError::NotFound) => "refresh_token_not_found",
            Self::Refresh(RefreshError::Expired) => "refresh_token_expired",
            Self::Refresh(RefreshError::Revoked) => "refresh_token_revoked",
            Self::Refresh(RefreshError::Generate(_)) => "refresh_token_generate_failed",
            Self::Refresh(RefreshError::Storage(_)) => "refresh_token_storage_failure",
            Self::InvalidServiceKey => "service_key_invalid",
            Self::Forbidden => "forbidden",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Token(TokenError::Encode(_) | TokenError::InvalidKey)
            | Self::Refresh(RefreshError::Generate(_) | RefreshError::Storage(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}
