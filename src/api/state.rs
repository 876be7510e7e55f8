use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::{
    auth::{password::hash_password_blocking, AuthConfig, PasswordError, SessionService},
    store::{ChirpStore, RefreshTokenStore, UserStore},
};

/// Shared by every handler through an `Extension` layer.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub users: Arc<dyn UserStore>,
    pub chirps: Arc<dyn ChirpStore>,
    decoy_hash: Arc<OnceCell<String>>,
}

impl AppState {
    /// Wire every collaborator to one backing store.
    #[must_use]
    pub fn new<S>(config: AuthConfig, store: Arc<S>) -> Self
    where
        S: UserStore + ChirpStore + RefreshTokenStore + 'static,
    {
        let refresh_tokens: Arc<dyn RefreshTokenStore> = store.clone();
        let users: Arc<dyn UserStore> = store.clone();
        let chirps: Arc<dyn ChirpStore> = store;
        Self {
            sessions: SessionService::new(Arc::new(config), refresh_tokens),
            users,
            chirps,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        self.sessions.config()
    }

    /// Hash at the configured cost that logins for unknown emails are checked
    /// against, so both failures cost one bcrypt verification.
    ///
    /// # Errors
    /// Hashing failure or timeout on first use.
    pub async fn decoy_hash(&self) -> Result<&str, PasswordError> {
        let config = self.config();
        self.decoy_hash
            .get_or_try_init(|| {
                hash_password_blocking(
                    "chirpy-unknown-account".to_string(),
                    config.password_cost(),
                    config.password_hash_timeout(),
                )
            })
            .await
            .map(String::as_str)
    }
}
