use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    access_token::issue_access_token, config::AuthConfig, error::AuthError,
    refresh_token::RefreshTokenManager,
};
use crate::store::RefreshTokenStore;

/// Token pair handed out at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session lifecycle on top of the token codec and refresh manager.
#[derive(Clone)]
pub struct SessionService {
    config: Arc<AuthConfig>,
    refresh: RefreshTokenManager,
}

impl SessionService {
    #[must_use]
    pub fn new(config: Arc<AuthConfig>, store: Arc<dyn RefreshTokenStore>) -> Self {
        let refresh = RefreshTokenManager::new(store, config.refresh_token_ttl());
        Self { config, refresh }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// # Errors
    /// Token encoding or refresh token persistence failure.
    #[instrument(skip(self))]
    pub async fn issue_session(&self, user_id: Uuid) -> Result<Session, AuthError> {
        let access_token = self.access_token_for(user_id)?;
        let refresh_token = self.refresh.issue(user_id).await?;

        info!(%user_id, "Session issued");

        Ok(Session {
            access_token,
            refresh_token,
        })
    }

    /// Fresh access token for the owner of a live refresh token.
    ///
    /// # Errors
    /// Any refresh rejection (`NotFound`, `Expired`, `Revoked`) or store failure.
    #[instrument(skip_all)]
    pub async fn renew_access(&self, refresh_token: &str) -> Result<String, AuthError> {
        let user_id = self.refresh.redeem(refresh_token).await?;
        let access_token = self.access_token_for(user_id)?;

        info!(%user_id, "Access token renewed");

        Ok(access_token)
    }

    /// # Errors
    /// `NotFound` for an unknown token, or store failure.
    #[instrument(skip_all)]
    pub async fn end_session(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.refresh.revoke(refresh_token).await?;

        info!("Session ended");

        Ok(())
    }

    fn access_token_for(&self, user_id: Uuid) -> Result<String, AuthError> {
        Ok(issue_access_token(
            user_id,
            self.config.token_secret(),
            self.config.access_token_ttl(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        access_token::validate_access_token,
        error::{RefreshError, TokenError},
    };
    use crate::store::MemoryStore;
    use secrecy::SecretString;
    use std::time::Duration;

    fn service(config: AuthConfig) -> SessionService {
        SessionService::new(Arc::new(config), Arc::new(MemoryStore::new()))
    }

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("session-secret".to_string()),
            SecretString::from("service-key".to_string()),
        )
    }

    #[tokio::test]
    async fn issue_renew_end() -> Result<(), AuthError> {
        let sessions = service(config());
        let user_id = Uuid::new_v4();

        let session = sessions.issue_session(user_id).await?;
        assert_eq!(
            validate_access_token(&session.access_token, b"session-secret")?,
            user_id
        );
        assert_ne!(session.access_token, session.refresh_token);

        let renewed = sessions.renew_access(&session.refresh_token).await?;
        assert_eq!(validate_access_token(&renewed, b"session-secret")?, user_id);

        sessions.end_session(&session.refresh_token).await?;
        assert!(matches!(
            sessions.renew_access(&session.refresh_token).await,
            Err(AuthError::Refresh(RefreshError::Revoked))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn configured_ttls_apply() -> Result<(), AuthError> {
        let sessions = service(
            config()
                .with_access_token_ttl(Duration::ZERO)
                .with_refresh_token_ttl(chrono::Duration::zero()),
        );
        let session = sessions.issue_session(Uuid::new_v4()).await?;

        assert!(matches!(
            validate_access_token(&session.access_token, b"session-secret"),
            Err(TokenError::Expired)
        ));
        assert!(matches!(
            sessions.renew_access(&session.refresh_token).await,
            Err(AuthError::Refresh(RefreshError::Expired))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_refresh_token() {
        let sessions = service(config());
        assert!(matches!(
            sessions.renew_access("nope").await,
            Err(AuthError::Refresh(RefreshError::NotFound))
        ));
        assert!(matches!(
            sessions.end_session("nope").await,
            Err(AuthError::Refresh(RefreshError::NotFound))
        ));
    }
}
