//! 持久实体的内存仓储

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use idp_common::{ClientId, Snowflake, UserId};
use idp_errors::{AppError, AppResult};
use tracing::debug;

use crate::domain::client::OAuth2Client;
use crate::domain::consent::OAuth2Consent;
use crate::domain::repositories::{
    ConsentRepository, OAuth2ClientRepository, RefreshTokenRepository, UserRepository,
};
use crate::domain::user::User;

#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<DashMap<UserId, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &User) -> AppResult<()> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::conflict(format!("Username {} already exists", user.username)));
        }

        match self.users.entry(user.id) {
            Entry::Occupied(_) => Err(AppError::conflict(format!("User {} already exists", user.id))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryClientRepository {
    clients: Arc<DashMap<ClientId, OAuth2Client>>,
}

impl MemoryClientRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuth2ClientRepository for MemoryClientRepository {
    async fn create(&self, client: &OAuth2Client) -> AppResult<()> {
        match self.clients.entry(client.id) {
            Entry::Occupied(_) => Err(AppError::conflict(format!("Client {} already exists", client.id))),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: ClientId) -> AppResult<Option<OAuth2Client>> {
        Ok(self.clients.get(&id).map(|entry| entry.value().clone()))
    }
}

/// 刷新令牌谱系行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshLineage {
    pub access_id: Snowflake,
    pub sequence: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRefreshTokenRepository {
    lineages: Arc<DashMap<Snowflake, RefreshLineage>>,
}

impl MemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, refresh_id: Snowflake) -> Option<RefreshLineage> {
        self.lineages.get(&refresh_id).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.lineages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn create(&self, refresh_id: Snowflake, access_id: Snowflake) -> AppResult<()> {
        match self.lineages.entry(refresh_id) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Refresh token {} already exists",
                refresh_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(RefreshLineage {
                    access_id,
                    sequence: 0,
                });
                Ok(())
            }
        }
    }

    async fn rotate(&self, refresh_id: Snowflake, expected_seq: u64, access_id: Snowflake) -> AppResult<()> {
        // get_mut 持有分片写锁，比较与写入在同一临界区内完成
        match self.lineages.get_mut(&refresh_id) {
            Some(mut lineage) if lineage.sequence == expected_seq => {
                lineage.access_id = access_id;
                lineage.sequence += 1;
                Ok(())
            }
            _ => {
                debug!(%refresh_id, expected_seq, "Refresh token rotation matched no row");
                Err(AppError::not_found("Refresh token not found"))
            }
        }
    }

    async fn delete(&self, refresh_id: Snowflake) -> AppResult<()> {
        self.lineages.remove(&refresh_id);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryConsentRepository {
    consents: Arc<DashMap<(UserId, ClientId), OAuth2Consent>>,
}

impl MemoryConsentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentRepository for MemoryConsentRepository {
    async fn upsert(&self, consent: &OAuth2Consent) -> AppResult<()> {
        self.consents
            .insert((consent.user_id, consent.client_id), consent.clone());
        Ok(())
    }

    async fn find(&self, user_id: UserId, client_id: ClientId) -> AppResult<Option<OAuth2Consent>> {
        Ok(self
            .consents
            .get(&(user_id, client_id))
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scope::ScopeVocabulary;
    use crate::domain::secret::HashedSecret;

    #[tokio::test]
    async fn test_rotation_is_compare_and_swap() {
        let repo = MemoryRefreshTokenRepository::new();
        let refresh_id = Snowflake(100);
        repo.create(refresh_id, Snowflake(1)).await.unwrap();

        repo.rotate(refresh_id, 0, Snowflake(2)).await.unwrap();
        assert_eq!(
            repo.get(refresh_id),
            Some(RefreshLineage {
                access_id: Snowflake(2),
                sequence: 1
            })
        );

        let stale = repo.rotate(refresh_id, 0, Snowflake(3)).await;
        assert!(stale.unwrap_err().is_not_found());

        repo.delete(refresh_id).await.unwrap();
        assert!(repo.rotate(refresh_id, 1, Snowflake(4)).await.unwrap_err().is_not_found());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_rotation_has_one_winner() {
        let repo = MemoryRefreshTokenRepository::new();
        let refresh_id = Snowflake(7);
        repo.create(refresh_id, Snowflake(1)).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.rotate(refresh_id, 0, Snowflake(10 + i)).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(repo.get(refresh_id).unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn test_user_username_is_unique() {
        let repo = MemoryUserRepository::new();
        let vocab = ScopeVocabulary::standard().unwrap();
        let alice = User::new(UserId::from_i64(1), "alice", "Alice", HashedSecret::default(), vocab.full_scope());
        let imposter = User::new(UserId::from_i64(2), "alice", "Other", HashedSecret::default(), vocab.full_scope());

        repo.create(&alice).await.unwrap();
        assert!(matches!(repo.create(&imposter).await, Err(AppError::Conflict(_))));
        assert_eq!(
            repo.find_by_username("alice").await.unwrap().unwrap().id,
            UserId::from_i64(1)
        );
        assert!(repo.find_by_id(UserId::from_i64(2)).await.unwrap().is_none());
    }
}
