//! Opaque refresh tokens backed by a [`RefreshTokenStore`].
//!
//! The raw token leaves this module exactly once, on issue. Storage only ever
//! sees its SHA-256 digest, so a leaked table cannot be replayed.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::error::RefreshError;
use crate::store::{NewRefreshToken, RefreshTokenStore};

/// Entropy per token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// 32 bytes from the OS RNG, base64url without padding.
///
/// # Errors
/// Returns `Generate` if the OS RNG is unavailable.
pub fn generate_refresh_token() -> Result<String, RefreshError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Lookup key for a raw token (lowercase hex SHA-256).
#[must_use]
pub fn hash_refresh_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
    ttl: chrono::Duration,
}

impl RefreshTokenManager {
    #[must_use]
    pub fn new(store: Arc<dyn RefreshTokenStore>, ttl: chrono::Duration) -> Self {
        Self { store, ttl }
    }

    /// Mint and persist a token for `user_id`.
    ///
    /// # Errors
    /// `Generate` on RNG failure, `Storage` if the row cannot be written.
    #[instrument(skip(self))]
    pub async fn issue(&self, user_id: Uuid) -> Result<String, RefreshError> {
        let token = generate_refresh_token()?;
        let expires_at = Utc::now() + self.ttl;

        self.store
            .create_refresh_token(NewRefreshToken {
                token_hash: hash_refresh_token(&token),
                user_id,
                expires_at,
            })
            .await
            .map_err(RefreshError::Storage)?;

        Ok(token)
    }

    /// Owner of a live token. Does not consume it.
    ///
    /// # Errors
    /// `NotFound`, then `Expired` (even if also revoked), then `Revoked`.
    /// Store failures surface as `Storage`.
    #[instrument(skip_all)]
    pub async fn redeem(&self, token: &str) -> Result<Uuid, RefreshError> {
        let record = self
            .store
            .get_refresh_token(&hash_refresh_token(token))
            .await
            .map_err(RefreshError::Storage)?
            .ok_or(RefreshError::NotFound)?;

        if record.is_expired_at(Utc::now()) {
            return Err(RefreshError::Expired);
        }
        if record.is_revoked() {
            return Err(RefreshError::Revoked);
        }

        Ok(record.user_id)
    }

    /// Revoke a token. Repeating the call is a no-op.
    ///
    /// # Errors
    /// `NotFound` for an unknown token, `Storage` on store failure.
    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> Result<(), RefreshError> {
        self.store
            .revoke_refresh_token(&hash_refresh_token(token), Utc::now())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RefreshTokenRecord, StoreError, StoreResult};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};

    fn manager(ttl: Duration) -> (Arc<MemoryStore>, RefreshTokenManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = RefreshTokenManager::new(store.clone(), ttl);
        (store, manager)
    }

    struct BrokenStore;

    #[async_trait]
    impl RefreshTokenStore for BrokenStore {
        async fn create_refresh_token(
            &self,
            _token: NewRefreshToken,
        ) -> StoreResult<RefreshTokenRecord> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn get_refresh_token(
            &self,
            _token_hash: &str,
        ) -> StoreResult<Option<RefreshTokenRecord>> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn revoke_refresh_token(
            &self,
            _token_hash: &str,
            _revoked_at: DateTime<Utc>,
        ) -> StoreResult<()> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[test]
    fn token_carries_32_bytes() -> Result<(), RefreshError> {
        let token = generate_refresh_token()?;
        let decoded = Base64UrlUnpadded::decode_vec(&token).map_err(|_| RefreshError::NotFound)?;
        assert_eq!(decoded.len(), REFRESH_TOKEN_BYTES);
        assert!(!token.contains('='));
        Ok(())
    }

    #[test]
    fn tokens_do_not_repeat() -> Result<(), RefreshError> {
        let tokens: std::collections::HashSet<String> = (0..64)
            .map(|_| generate_refresh_token())
            .collect::<Result<_, _>>()?;
        assert_eq!(tokens.len(), 64);
        Ok(())
    }

    #[test]
    fn digest_is_hex_sha256() {
        let digest = hash_refresh_token("token");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, hash_refresh_token("token"));
        assert_ne!(digest, hash_refresh_token("token2"));
    }

    #[tokio::test]
    async fn issue_then_redeem() -> Result<(), RefreshError> {
        let (store, manager) = manager(Duration::days(60));
        let user_id = Uuid::new_v4();
        let token = manager.issue(user_id).await?;

        assert_eq!(manager.redeem(&token).await?, user_id);
        // Redeem is not consuming.
        assert_eq!(manager.redeem(&token).await?, user_id);

        let record = store
            .get_refresh_token(&hash_refresh_token(&token))
            .await
            .map_err(RefreshError::Storage)?
            .ok_or(RefreshError::NotFound)?;
        assert_ne!(record.token_hash, token);
        assert!(record.expires_at > record.created_at + Duration::days(59));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_not_found() {
        let (_, manager) = manager(Duration::days(60));
        assert!(matches!(
            manager.redeem("never-issued").await,
            Err(RefreshError::NotFound)
        ));
        assert!(matches!(
            manager.revoke("never-issued").await,
            Err(RefreshError::NotFound)
        ));
    }

    #[tokio::test]
    async fn zero_ttl_is_expired() -> Result<(), RefreshError> {
        let (_, manager) = manager(Duration::zero());
        let token = manager.issue(Uuid::new_v4()).await?;
        assert!(matches!(manager.redeem(&token).await, Err(RefreshError::Expired)));
        Ok(())
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() -> Result<(), RefreshError> {
        let (_, manager) = manager(Duration::days(60));
        let token = manager.issue(Uuid::new_v4()).await?;

        manager.revoke(&token).await?;
        assert!(matches!(manager.redeem(&token).await, Err(RefreshError::Revoked)));

        manager.revoke(&token).await?;
        assert!(matches!(manager.redeem(&token).await, Err(RefreshError::Revoked)));
        Ok(())
    }

    #[tokio::test]
    async fn expiry_reported_before_revocation() -> Result<(), RefreshError> {
        let (_, manager) = manager(Duration::zero());
        let token = manager.issue(Uuid::new_v4()).await?;
        manager.revoke(&token).await?;
        assert!(matches!(manager.redeem(&token).await, Err(RefreshError::Expired)));
        Ok(())
    }

    #[tokio::test]
    async fn store_failure_is_not_not_found() {
        let manager = RefreshTokenManager::new(Arc::new(BrokenStore), Duration::days(60));
        assert!(matches!(
            manager.issue(Uuid::new_v4()).await,
            Err(RefreshError::Storage(_))
        ));
        assert!(matches!(
            manager.redeem("anything").await,
            Err(RefreshError::Storage(_))
        ));
        assert!(matches!(
            manager.revoke("anything").await,
            Err(RefreshError::Storage(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn redeem_racing_revoke_sees_all_or_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let (store, manager) = manager(Duration::days(1));

        for _ in 0..50 {
            let user_id = Uuid::new_v4();
            let token = manager.issue(user_id).await?;

            let redeem = |manager: RefreshTokenManager, token: String| {
                tokio::spawn(async move { manager.redeem(&token).await })
            };
            let revoke = {
                let (manager, token) = (manager.clone(), token.clone());
                tokio::spawn(async move { manager.revoke(&token).await })
            };
            let (revoked, first, second) = tokio::join!(
                revoke,
                redeem(manager.clone(), token.clone()),
                redeem(manager.clone(), token.clone()),
            );

            revoked??;
            for outcome in [first?, second?] {
                assert!(
                    matches!(outcome, Ok(owner) if owner == user_id)
                        || matches!(outcome, Err(RefreshError::Revoked)),
                    "unexpected redeem outcome {outcome:?}"
                );
            }

            assert!(matches!(manager.redeem(&token).await, Err(RefreshError::Revoked)));
            let record = store
                .get_refresh_token(&hash_refresh_token(&token))
                .await?
                .ok_or("token row vanished")?;
            assert_eq!(record.revoked_at, Some(record.updated_at));
        }
        Ok(())
    }
}
