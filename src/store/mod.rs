//! Storage collaborators.
//!
//! The auth core only needs [`RefreshTokenStore`]. The HTTP glue also uses
//! [`UserStore`] and [`ChirpStore`]. Every operation must be atomic per record:
//! a revoke racing a lookup on the same token observes all or nothing of the
//! revocation.
//!
//! Two adapters ship with the crate:
//! - [`PgStore`]: Postgres via `sqlx`, one statement per operation.
//! - [`MemoryStore`]: process-local maps behind a `RwLock`, used by tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row to persist for a freshly issued refresh token.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create_refresh_token(&self, token: NewRefreshToken)
        -> StoreResult<RefreshTokenRecord>;

    /// Exact match on the token digest.
    async fn get_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Mark the token revoked. An already revoked token keeps its first
    /// `revoked_at`. Returns [`StoreError::NotFound`] when no row matches.
    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns [`StoreError::Conflict`] when the email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// Replace email and password hash in one write.
    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> StoreResult<UserRecord>;

    async fn upgrade_to_chirpy_red(&self, id: Uuid) -> StoreResult<()>;

    /// Liveness check for the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct NewChirp {
    pub body: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ChirpRecord {
    pub id: Uuid,
    pub body: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ChirpStore: Send + Sync {
    async fn create_chirp(&self, chirp: NewChirp) -> StoreResult<ChirpRecord>;

    /// All chirps, oldest first, optionally restricted to one author.
    async fn list_chirps(&self, author_id: Option<Uuid>) -> StoreResult<Vec<ChirpRecord>>;

    async fn get_chirp(&self, id: Uuid) -> StoreResult<Option<ChirpRecord>>;

    async fn delete_chirp(&self, id: Uuid) -> StoreResult<()>;
}
