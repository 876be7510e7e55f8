use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::{
    access_token::validate_access_token,
    credentials::{extract_api_key, extract_bearer, HeaderSource},
    error::AuthError,
};

/// Identity behind the bearer access token of a request.
///
/// # Errors
/// Extraction or token validation failure.
pub fn authenticate_request<H>(headers: &H, secret: &[u8]) -> Result<Uuid, AuthError>
where
    H: HeaderSource + ?Sized,
{
    let token = extract_bearer(headers)?;
    Ok(validate_access_token(token, secret)?)
}

/// Accept only callers presenting exactly the configured service key.
///
/// # Errors
/// Extraction failure, or `InvalidServiceKey` when the key differs.
pub fn authorize_service_call<H>(headers: &H, configured_key: &SecretString) -> Result<(), AuthError>
where
    H: HeaderSource + ?Sized,
{
    let presented = extract_api_key(headers)?;
    let expected = configured_key.expose_secret().as_bytes();

    // Length mismatch compares false. An unset key authorizes nobody.
    if !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected)) {
        Ok(())
    } else {
        Err(AuthError::InvalidServiceKey)
    }
}

/// # Errors
/// `Forbidden` unless `user_id` owns the resource.
pub fn authorize_ownership(owner_id: Uuid, user_id: Uuid) -> Result<(), AuthError> {
    if owner_id == user_id {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
