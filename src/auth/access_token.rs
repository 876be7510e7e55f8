//! Stateless access tokens.
//!
//! Compact JWS layout: `base64url(header).base64url(claims).base64url(mac)`,
//! no padding, so the whole token is header-safe. Validation needs only the
//! token, the secret and the clock.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

use super::error::TokenError;

/// Issuer written into and required from every token.
pub const ISSUER: &str = "chirpy";

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// MAC over the signing input. HMAC-SHA256 today; the codec only talks to
/// `sign` and `verify`.
pub struct SigningKey<'a> {
    secret: &'a [u8],
}

impl<'a> SigningKey<'a> {
    #[must_use]
    pub const fn new(secret: &'a [u8]) -> Self {
        Self { secret }
    }

    fn mac(&self, input: &[u8]) -> Result<Hmac<Sha256>, TokenError> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(self.secret).map_err(|_| TokenError::InvalidKey)?;
        mac.update(input);
        Ok(mac)
    }

    /// # Errors
    /// Returns `InvalidKey` if the MAC rejects the secret.
    pub fn sign(&self, input: &[u8]) -> Result<Vec<u8>, TokenError> {
        Ok(self.mac(input)?.finalize().into_bytes().to_vec())
    }

    /// Constant-time check of `signature` over `input`.
    ///
    /// # Errors
    /// Returns `BadSignature` on mismatch.
    pub fn verify(&self, input: &[u8], signature: &[u8]) -> Result<(), TokenError> {
        self.mac(input)?
            .verify_slice(signature)
            .map_err(|_| TokenError::BadSignature)
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

fn sign_claims(claims: &AccessTokenClaims, secret: &[u8]) -> Result<String, TokenError> {
    let header_b64 = b64e_json(&TokenHeader::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let signature = SigningKey::new(secret).sign(signing_input.as_bytes())?;
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Issue a token for `user_id` valid for `ttl` from now.
///
/// # Errors
/// Returns an error if the claims cannot be encoded or the key is unusable.
pub fn issue_access_token(user_id: Uuid, secret: &[u8], ttl: Duration) -> Result<String, TokenError> {
    issue_access_token_at(user_id, secret, ttl, Utc::now().timestamp())
}

/// Issue a token as if the clock read `now_unix_seconds`.
///
/// A zero `ttl` produces a token that is already expired.
///
/// # Errors
/// Returns an error if the claims cannot be encoded or the key is unusable.
pub fn issue_access_token_at(
    user_id: Uuid,
    secret: &[u8],
    ttl: Duration,
    now_unix_seconds: i64,
) -> Result<String, TokenError> {
    let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = AccessTokenClaims {
        iss: ISSUER.to_string(),
        sub: user_id.to_string(),
        iat: now_unix_seconds,
        exp: now_unix_seconds.saturating_add(ttl_seconds),
    };
    sign_claims(&claims, secret)
}

/// Validate a token against the current clock and return its subject.
///
/// # Errors
/// See [`validate_access_token_at`].
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<Uuid, TokenError> {
    validate_access_token_at(token, secret, Utc::now().timestamp())
}

/// Validate a token and return its subject.
///
/// Checks run in order: structure, signature, expiry, issuer, subject.
///
/// # Errors
///
/// - `Malformed`: not three segments, bad base64/json, or not HS256.
/// - `BadSignature`: MAC does not match `secret`.
/// - `Expired`: `now_unix_seconds >= exp`.
/// - `WrongIssuer`: `iss` is not [`ISSUER`].
/// - `BadSubject`: `sub` is not a UUID.
pub fn validate_access_token_at(
    token: &str,
    secret: &[u8],
    now_unix_seconds: i64,
) -> Result<Uuid, TokenError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(TokenError::Malformed)?;
    let claims_b64 = parts.next().ok_or(TokenError::Malformed)?;
    let sig_b64 = parts.next().ok_or(TokenError::Malformed)?;
    if parts.next().is_some() {
        return Err(TokenError::Malformed);
    }

    let header: TokenHeader = b64d_json(header_b64)?;
    if header.alg != ALGORITHM {
        return Err(TokenError::Malformed);
    }

    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Malformed)?;
    SigningKey::new(secret).verify(signing_input.as_bytes(), &signature)?;

    let claims: AccessTokenClaims = b64d_json(claims_b64)?;
    if now_unix_seconds >= claims.exp {
        return Err(TokenError::Expired);
    }
    if claims.iss != ISSUER {
        return Err(TokenError::WrongIssuer);
    }

    Uuid::parse_str(&claims.sub).map_err(|_| TokenError::BadSubject)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"a-test-secret-that-is-long-enough";
    const NOW: i64 = 1_700_000_000;

    fn claims(iss: &str, sub: &str) -> AccessTokenClaims {
        AccessTokenClaims {
            iss: iss.to_string(),
            sub: sub.to_string(),
            iat: NOW,
            exp: NOW + 60,
        }
    }

    #[test]
    fn issue_then_validate() -> Result<(), TokenError> {
        let id = Uuid::new_v4();
        let token = issue_access_token(id, SECRET, Duration::from_secs(3600))?;
        assert_eq!(validate_access_token(&token, SECRET)?, id);
        Ok(())
    }

    #[test]
    fn claims_carry_issuer_and_window() -> Result<(), TokenError> {
        let id = Uuid::new_v4();
        let token = issue_access_token_at(id, SECRET, Duration::from_secs(90), NOW)?;
        let claims_b64 = token.split('.').nth(1).ok_or(TokenError::Malformed)?;
        let decoded: AccessTokenClaims = b64d_json(claims_b64)?;
        assert_eq!(decoded.iss, ISSUER);
        assert_eq!(decoded.sub, id.to_string());
        assert_eq!(decoded.iat, NOW);
        assert_eq!(decoded.exp, NOW + 90);
        Ok(())
    }

    #[test]
    fn zero_ttl_is_already_expired() -> Result<(), TokenError> {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::ZERO)?;
        assert!(matches!(
            validate_access_token(&token, SECRET),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn expiry_boundary() -> Result<(), TokenError> {
        let id = Uuid::new_v4();
        let token = issue_access_token_at(id, SECRET, Duration::from_secs(10), NOW)?;
        assert_eq!(validate_access_token_at(&token, SECRET, NOW + 9)?, id);
        assert!(matches!(
            validate_access_token_at(&token, SECRET, NOW + 10),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn wrong_secret_is_bad_signature() -> Result<(), TokenError> {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::from_secs(60))?;
        assert!(matches!(
            validate_access_token(&token, b"another-secret"),
            Err(TokenError::BadSignature)
        ));
        Ok(())
    }

    #[test]
    fn signature_checked_before_expiry() -> Result<(), TokenError> {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::ZERO)?;
        assert!(matches!(
            validate_access_token(&token, b"another-secret"),
            Err(TokenError::BadSignature)
        ));
        Ok(())
    }

    #[test]
    fn swapped_claims_are_bad_signature() -> Result<(), TokenError> {
        let victim = issue_access_token_at(Uuid::new_v4(), SECRET, Duration::from_secs(60), NOW)?;
        let attacker = issue_access_token_at(Uuid::new_v4(), SECRET, Duration::from_secs(60), NOW)?;

        let victim_parts: Vec<&str> = victim.split('.').collect();
        let attacker_parts: Vec<&str> = attacker.split('.').collect();
        let forged = format!(
            "{}.{}.{}",
            victim_parts[0], attacker_parts[1], victim_parts[2]
        );

        assert!(matches!(
            validate_access_token_at(&forged, SECRET, NOW),
            Err(TokenError::BadSignature)
        ));
        Ok(())
    }

    #[test]
    fn foreign_issuer_rejected() -> Result<(), TokenError> {
        let token = sign_claims(&claims("someone-else", &Uuid::new_v4().to_string()), SECRET)?;
        assert!(matches!(
            validate_access_token_at(&token, SECRET, NOW),
            Err(TokenError::WrongIssuer)
        ));
        Ok(())
    }

    #[test]
    fn expiry_checked_before_issuer() -> Result<(), TokenError> {
        let mut stale = claims("someone-else", &Uuid::new_v4().to_string());
        stale.iat = 0;
        stale.exp = 10;
        let token = sign_claims(&stale, SECRET)?;
        assert!(matches!(
            validate_access_token_at(&token, SECRET, 100),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn non_uuid_subject_rejected()-> Result<(), TokenError> {
        let token = sign_claims(&claims(ISSUER, "user-42"), SECRET)?;
        assert!(matches!(
            validate_access_token_at(&token, SECRET, NOW),
            Err(TokenError::BadSubject)
        ));
        Ok(())
    }

    #[test]
    fn malformed_tokens() {
        for token in ["", "garbage", "a.b", "a.b.c.d", "!!!.e30.sig"] {
            assert!(
                matches!(
                    validate_access_token_at(token, SECRET, NOW),
                    Err(TokenError::Malformed)
                ),
                "expected Malformed for {token:?}"
            );
        }
    }

    #[test]
    fn unsigned_algorithm_rejected() -> Result<(), TokenError> {
        let header = b64e_json(&TokenHeader {
            alg: "none".to_string(),
            typ: TOKEN_TYPE.to_string(),
        })?;
        let body = b64e_json(&claims(ISSUER, &Uuid::new_v4().to_string()))?;
        let token = format!("{header}.{body}.");
        assert!(matches!(
            validate_access_token_at(&token, SECRET, NOW),
            Err(TokenError::Malformed)
        ));
        Ok(())
    }

    #[test]
    fn token_is_header_safe() -> Result<(), TokenError> {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::from_secs(60))?;
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
        assert_eq!(token.matches('.').count(), 2);
        Ok(())
    }
}
