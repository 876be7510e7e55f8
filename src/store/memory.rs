use super::{
    ChirpRecord, ChirpStore, NewChirp, NewRefreshToken, NewUser, RefreshTokenRecord,
    RefreshTokenStore, StoreError, StoreResult, UserRecord, UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    chirps: Vec<ChirpRecord>,
}

/// In-process store. One lock covers all tables, so each call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn create_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> StoreResult<RefreshTokenRecord> {
        let mut tables = self.tables.write().await;
        if tables.refresh_tokens.contains_key(&token.token_hash) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let record = RefreshTokenRecord {
            token_hash: token.token_hash,
            user_id: token.user_id,
            created_at: now,
            updated_at: now,
            expires_at: token.expires_at,
            revoked_at: None,
        };
        tables
            .refresh_tokens
            .insert(record.token_hash.clone(), record.clone());

        Ok(record)
    }

    async fn get_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        Ok(self.tables.read().await.refresh_tokens.get(token_hash).cloned())
    }

    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let record = tables
            .refresh_tokens
            .get_mut(token_hash)
            .ok_or(StoreError::NotFound)?;

        if record.revoked_at.is_none() {
            record.revoked_at = Some(revoked_at);
            record.updated_at = revoked_at;
        }

        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            hashed_password: user.hashed_password,
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(record.id, record.clone());

        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> StoreResult<UserRecord> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email && u.id != id) {
            return Err(StoreError::Conflict);
        }

        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn upgrade_to_chirpy_red(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.is_chirpy_red = true;
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ChirpStore for MemoryStore {
    async fn create_chirp(&self, chirp: NewChirp) -> StoreResult<ChirpRecord> {
        let now = Utc::now();
        let record = ChirpRecord {
            id: Uuid::new_v4(),
            body: chirp.body,
            user_id: chirp.user_id,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.chirps.push(record.clone());

        Ok(record)
    }

    async fn list_chirps(&self, author_id: Option<Uuid>) -> StoreResult<Vec<ChirpRecord>> {
        let mut chirps: Vec<ChirpRecord> = self
            .tables
            .read()
            .await
            .chirps
            .iter()
            .filter(|c| author_id.map_or(true, |author| c.user_id == author))
            .cloned()
            .collect();
        chirps.sort_by_key(|c| c.created_at);

        Ok(chirps)
    }

    async fn get_chirp(&self, id: Uuid) -> StoreResult<Option<ChirpRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .chirps
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn delete_chirp(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let index = tables
            .chirps
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::NotFound)?;
        tables.chirps.remove(index);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_token(hash: &str) -> NewRefreshToken {
        NewRefreshToken {
            token_hash: hash.to_string(),
            user_id: Uuid::new_v4(),
            expires_at: Utc::now() + Duration::days(60),
        }
    }

    #[tokio::test]
    async fn revoke_keeps_first_timestamp() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store.create_refresh_token(new_token("a")).await?;

        let first = Utc::now();
        store.revoke_refresh_token("a", first).await?;
        store
            .revoke_refresh_token("a", first + Duration::minutes(5))
            .await?;

        let record = store.get_refresh_token("a").await?;
        assert_eq!(record.and_then(|r| r.revoked_at), Some(first));
        Ok(())
    }

    #[tokio::test]
    async fn revoke_unknown_token_is_not_found() {
        let store = MemoryStore::new();
        let result = store.revoke_refresh_token("missing", Utc::now()).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let user = NewUser {
            email: "a@example.com".to_string(),
            hashed_password: "x".to_string(),
        };
        store.create_user(user.clone()).await?;
        assert!(matches!(
            store.create_user(user).await,
            Err(StoreError::Conflict)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn list_filters_by_author() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        for (body, user_id) in [("one", alice), ("two", bob), ("three", alice)] {
            store
                .create_chirp(NewChirp {
                    body: body.to_string(),
                    user_id,
                })
                .await?;
        }

        let bodies: Vec<String> = store
            .list_chirps(Some(alice))
            .await?
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, vec!["one".to_string(), "three".to_string()]);
        assert_eq!(store.list_chirps(None).await?.len(), 3);
        Ok(())
    }
}
