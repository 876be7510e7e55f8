//! Password hashing with bcrypt.
//!
//! Inputs over bcrypt's 72-byte limit are rejected, never truncated: two long
//! passwords sharing a 72-byte prefix must not verify against each other.

use std::time::Duration;
use tracing::warn;

use super::error::PasswordError;

/// Work factor used when none is configured.
pub const DEFAULT_COST: u32 = 10;

/// Bytes bcrypt actually consumes.
pub const MAX_PASSWORD_BYTES: usize = 72;

fn check_input(password: &str) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::EmptyInput);
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::InputTooLong {
            len: password.len(),
            max: MAX_PASSWORD_BYTES,
        });
    }
    Ok(())
}

/// Hash with [`DEFAULT_COST`].
///
/// # Errors
/// `EmptyInput` or `InputTooLong` for unusable input, `Hash` if bcrypt fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with_cost(password, DEFAULT_COST)
}

/// Hash with an explicit work factor. Each call draws a fresh salt.
///
/// # Errors
/// `EmptyInput` or `InputTooLong` for unusable input, `Hash` if bcrypt fails
/// (including a cost outside 4..=31).
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, PasswordError> {
    check_input(password)?;
    bcrypt::hash(password, cost).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check `password` against a stored bcrypt string.
///
/// # Errors
/// `Mismatch` when the password is wrong or the stored hash is unreadable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), PasswordError> {
    match bcrypt::verify(password, stored_hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(PasswordError::Mismatch),
        Err(e) => {
            warn!("Stored password hash is unreadable: {e}");
            Err(PasswordError::Mismatch)
        }
    }
}

/// [`hash_password_with_cost`] on the blocking pool, bounded by `timeout`.
///
/// # Errors
/// Same as [`hash_password_with_cost`], plus `Timeout`.
pub async fn hash_password_blocking(
    password: String,
    cost: u32,
    timeout: Duration,
) -> Result<String, PasswordError> {
    check_input(&password)?;
    let task = tokio::task::spawn_blocking(move || hash_password_with_cost(&password, cost));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(PasswordError::Hash(e.to_string())),
        Err(_) => Err(PasswordError::Timeout),
    }
}

/// [`verify_password`] on the blocking pool, bounded by `timeout`.
///
/// # Errors
/// Same as [`verify_password`], plus `Timeout`.
pub async fn verify_password_blocking(
    password: String,
    stored_hash: String,
    timeout: Duration,
) -> Result<(), PasswordError> {
    let task = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(PasswordError::Hash(e.to_string())),
        Err(_) => Err(PasswordError::Timeout),
    }
}
