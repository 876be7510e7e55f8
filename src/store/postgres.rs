use super::{
    ChirpRecord, ChirpStore, NewChirp, NewRefreshToken, NewUser, RefreshTokenRecord,
    RefreshTokenStore, StoreError, StoreResult, UserRecord, UserStore,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

/// Postgres adapter for every store trait.
///
/// Schema lives in `sql/schema.sql`; this type never migrates.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn create_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> StoreResult<RefreshTokenRecord> {
        let query = r"
            INSERT INTO refresh_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING token_hash, user_id, created_at, updated_at, expires_at, revoked_at
        ";
        sqlx::query_as::<_, RefreshTokenRecord>(query)
            .bind(&token.token_hash)
            .bind(token.user_id)
            .bind(token.expires_at)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(map_write_error)
    }

    async fn get_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let query = r"
            SELECT token_hash, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
        ";
        let record = sqlx::query_as::<_, RefreshTokenRecord>(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(record)
    }

    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        // Single statement: a concurrent lookup sees the row before or after, never between.
        let query = r"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $2),
                updated_at = CASE WHEN revoked_at IS NULL THEN $2 ELSE updated_at END
            WHERE token_hash = $1
        ";
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(revoked_at)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        let query = r"
            INSERT INTO users (id, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, email, hashed_password, is_chirpy_red, created_at, updated_at
        ";
        sqlx::query_as::<_, UserRecord>(query)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.hashed_password)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(map_write_error)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let query = r"
            SELECT id, email, hashed_password, is_chirpy_red, created_at, updated_at
            FROM users
            WHERE id = $1
        ";
        let user = sqlx::query_as::<_, UserRecord>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let query = r"
            SELECT id, email, hashed_password, is_chirpy_red, created_at, updated_at
            FROM users
            WHERE email = $1
        ";
        let user = sqlx::query_as::<_, UserRecord>(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(user)
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> StoreResult<UserRecord> {
        let query = r"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, hashed_password, is_chirpy_red, created_at, updated_at
        ";
        sqlx::query_as::<_, UserRecord>(query)
            .bind(id)
            .bind(email)
            .bind(hashed_password)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .map_err(map_write_error)?
            .ok_or(StoreError::NotFound)
    }

    async fn upgrade_to_chirpy_red(&self, id: Uuid) -> StoreResult<()> {
        let query = "UPDATE users SET is_chirpy_red = TRUE, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let query = "SELECT 1";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ChirpStore for PgStore {
    async fn create_chirp(&self, chirp: NewChirp) -> StoreResult<ChirpRecord> {
        let query = r"
            INSERT INTO chirps (id, body, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, body, user_id, created_at, updated_at
        ";
        let record = sqlx::query_as::<_, ChirpRecord>(query)
            .bind(Uuid::new_v4())
            .bind(&chirp.body)
            .bind(chirp.user_id)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await?;

        Ok(record)
    }

    async fn list_chirps(&self, author_id: Option<Uuid>) -> StoreResult<Vec<ChirpRecord>> {
        let query = r"
            SELECT id, body, user_id, created_at, updated_at
            FROM chirps
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at ASC
        ";
        let chirps = sqlx::query_as::<_, ChirpRecord>(query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(chirps)
    }

    async fn get_chirp(&self, id: Uuid) -> StoreResult<Option<ChirpRecord>> {
        let query = r"
            SELECT id, body, user_id, created_at, updated_at
            FROM chirps
            WHERE id = $1
        ";
        let chirp = sqlx::query_as::<_, ChirpRecord>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(chirp)
    }

    async fn delete_chirp(&self, id: Uuid) -> StoreResult<()> {
        let query = "DELETE FROM chirps WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
