//! Process-wide auth configuration, built once at startup and never mutated.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use super::password::DEFAULT_COST;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: u64 = 60 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 60;
const DEFAULT_PASSWORD_HASH_TIMEOUT_SECONDS: u64 = 5;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_secret: SecretString,
    service_key: SecretString,
    access_token_ttl: Duration,
    refresh_token_ttl: chrono::Duration,
    password_cost: u32,
    password_hash_timeout: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(token_secret: SecretString, service_key: SecretString) -> Self {
        Self {
            token_secret,
            service_key,
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
            refresh_token_ttl: chrono::Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            password_cost: DEFAULT_COST,
            password_hash_timeout: Duration::from_secs(DEFAULT_PASSWORD_HASH_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    #[must_use]
    pub fn with_password_hash_timeout(mut self, timeout: Duration) -> Self {
        self.password_hash_timeout = timeout;
        self
    }

    /// HMAC key for access tokens.
    #[must_use]
    pub fn token_secret(&self) -> &[u8] {
        self.token_secret.expose_secret().as_bytes()
    }

    #[must_use]
    pub const fn service_key(&self) -> &SecretString {
        &self.service_key
    }

    #[must_use]
    pub const fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    #[must_use]
    pub const fn refresh_token_ttl(&self) -> chrono::Duration {
        self.refresh_token_ttl
    }

    #[must_use]
    pub const fn password_cost(&self) -> u32 {
        self.password_cost
    }

    #[must_use]
    pub const fn password_hash_timeout(&self) -> Duration {
        self.password_hash_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::new(
            SecretString::from("secret".to_string()),
            SecretString::from("key".to_string()),
        );
        assert_eq!(config.access_token_ttl(), Duration::from_secs(3600));
        assert_eq!(config.refresh_token_ttl(), chrono::Duration::days(60));
        assert_eq!(config.password_cost(), 10);
        assert_eq!(config.token_secret(), b"secret");
        assert_eq!(config.service_key().expose_secret(), "key");
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AuthConfig::new(
            SecretString::from("top-secret-value".to_string()),
            SecretString::from("polka-key-value".to_string()),
        );
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("top-secret-value"));
        assert!(!rendered.contains("polka-key-value"));
    }
}
