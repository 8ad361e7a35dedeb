//! 基于 CachePort 的临时实体仓储
//!
//! 实体以 JSON 存储，TTL 取自实体的 `expires_at`，过期完全交给存储端。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use idp_common::{ClientId, UserId};
use idp_errors::{AppError, AppResult};
use idp_ports::CachePort;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::consent::OAuth2ConsentResult;
use crate::domain::flow::{
    Expiring, OAuth2AuthenticationResult, OAuth2AuthorizationCode, OAuth2AuthorizationStore, Session,
};
use crate::domain::repositories::{
    AuthenticationResultRepository, AuthorizationCodeRepository, AuthorizationStoreRepository,
    ConsentResultRepository, SessionRepository,
};

const CODE_PREFIX: &str = "oauth2:code:";
const STORE_PREFIX: &str = "oauth2:store:";
const AUTHN_RESULT_PREFIX: &str = "oauth2:authn:";
const CONSENT_RESULT_PREFIX: &str = "oauth2:consent_result:";
const SESSION_PREFIX: &str = "oauth2:session:";

/// 实现全部临时实体仓储
#[derive(Clone)]
pub struct CacheStore {
    cache: Arc<dyn CachePort>,
}

impl CacheStore {
    pub fn new(cache: Arc<dyn CachePort>) -> Self {
        Self { cache }
    }

    async fn put<T: Serialize + Expiring + Sync>(&self, key: &str, value: &T) -> AppResult<()> {
        let ttl = match (value.expires_at() - Utc::now()).to_std() {
            Ok(ttl) if !ttl.is_zero() => ttl,
            _ => {
                debug!("Entity already expired, not stored");
                return Ok(());
            }
        };

        let json = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Failed to encode cache entry: {}", e)))?;

        self.cache.set(key, &json, Some(ttl)).await
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.cache.get(key).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AppError::internal(format!("Failed to decode cache entry: {}", e))),
            None => Ok(None),
        }
    }
}

fn consent_result_key(user_id: UserId, client_id: ClientId) -> String {
    format!("{CONSENT_RESULT_PREFIX}{user_id}:{client_id}")
}

#[async_trait]
impl AuthorizationCodeRepository for CacheStore {
    async fn save(&self, code: &OAuth2AuthorizationCode) -> AppResult<()> {
        self.put(&format!("{CODE_PREFIX}{}", code.code), code).await
    }

    async fn find(&self, code: &str) -> AppResult<Option<OAuth2AuthorizationCode>> {
        self.fetch(&format!("{CODE_PREFIX}{code}")).await
    }

    async fn delete(&self, code: &str) -> AppResult<()> {
        self.cache.delete(&format!("{CODE_PREFIX}{code}")).await
    }
}

#[async_trait]
impl AuthorizationStoreRepository for CacheStore {
    async fn save(&self, store: &OAuth2AuthorizationStore) -> AppResult<()> {
        self.put(&format!("{STORE_PREFIX}{}", store.id), store).await
    }

    async fn find(&self, id: &str) -> AppResult<Option<OAuth2AuthorizationStore>> {
        self.fetch(&format!("{STORE_PREFIX}{id}")).await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.cache.delete(&format!("{STORE_PREFIX}{id}")).await
    }
}

#[async_trait]
impl AuthenticationResultRepository for CacheStore {
    async fn save(&self, result: &OAuth2AuthenticationResult) -> AppResult<()> {
        self.put(&format!("{AUTHN_RESULT_PREFIX}{}", result.id), result).await
    }

    async fn find(&self, id: &str) -> AppResult<Option<OAuth2AuthenticationResult>> {
        self.fetch(&format!("{AUTHN_RESULT_PREFIX}{id}")).await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.cache.delete(&format!("{AUTHN_RESULT_PREFIX}{id}")).await
    }
}

#[async_trait]
impl ConsentResultRepository for CacheStore {
    async fn save(&self, result: &OAuth2ConsentResult) -> AppResult<()> {
        self.put(&consent_result_key(result.user_id, result.client_id), result)
            .await
    }

    async fn find(&self, user_id: UserId, client_id: ClientId) -> AppResult<Option<OAuth2ConsentResult>> {
        self.fetch(&consent_result_key(user_id, client_id)).await
    }

    async fn delete(&self, user_id: UserId, client_id: ClientId) -> AppResult<()> {
        self.cache.delete(&consent_result_key(user_id, client_id)).await
    }
}

#[async_trait]
impl SessionRepository for CacheStore {
    async fn load(&self, session_id: &str) -> AppResult<Option<Session>> {
        self.fetch(&format!("{SESSION_PREFIX}{session_id}")).await
    }

    async fn save(&self, session_id: &str, session: &Session) -> AppResult<()> {
        self.put(&format!("{SESSION_PREFIX}{session_id}"), session).await
    }
}
