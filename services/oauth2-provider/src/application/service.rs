//! OAuth2 协议编排服务

use std::future::Future;
use std::sync::{Arc, OnceLock};

use chrono::Duration;
use idp_common::SnowflakeGenerator;
use idp_config::FlowConfig;
use idp_errors::AppResult;
use secrecy::{ExposeSecret, Secret};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::context::RequestContext;
use crate::domain::flow::ttl_from_secs;
use crate::domain::repositories::{
    AuthenticationResultRepository, AuthorizationCodeRepository, AuthorizationStoreRepository,
    ConsentRepository, ConsentResultRepository, OAuth2ClientRepository, RefreshTokenRepository,
    SessionRepository, UserRepository,
};
use crate::domain::scope::ScopeVocabulary;
use crate::domain::secret::{HashedSecret, SecretHasher};
use crate::domain::token::{TokenFactory, TokenSigner};
use crate::infrastructure::persistence::CacheStore;
use crate::infrastructure::persistence::memory::{
    MemoryCache, MemoryClientRepository, MemoryConsentRepository, MemoryRefreshTokenRepository,
    MemoryUserRepository,
};

const DUMMY_PASSWORD: &str = "idp-unknown-user-placeholder";

/// 各临时实体的 TTL，以及单次持久化调用的超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    pub authorization_code_ttl: Duration,
    pub authorization_store_ttl: Duration,
    pub authentication_result_ttl: Duration,
    pub session_ttl: Duration,
    pub consent_ttl: Duration,
    pub consent_result_ttl: Duration,
    pub persistence_timeout: std::time::Duration,
}

impl From<&FlowConfig> for FlowSettings {
    fn from(config: &FlowConfig) -> Self {
        Self {
            authorization_code_ttl: ttl_from_secs(config.authorization_code_ttl),
            authorization_store_ttl: ttl_from_secs(config.authorization_store_ttl),
            authentication_result_ttl: ttl_from_secs(config.authentication_result_ttl),
            session_ttl: ttl_from_secs(config.session_ttl),
            consent_ttl: ttl_from_secs(config.consent_ttl),
            consent_result_ttl: ttl_from_secs(config.consent_result_ttl),
            persistence_timeout: config.persistence_timeout(),
        }
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self::from(&FlowConfig::default())
    }
}

/// 编排服务的运行参数
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub flow: FlowSettings,
    /// 与外部身份前端共享的回调密钥
    pub callback_secret: Secret<String>,
}

impl ServiceSettings {
    pub fn new(flow: FlowSettings, callback_secret: impl Into<String>) -> Self {
        Self {
            flow,
            callback_secret: Secret::new(callback_secret.into()),
        }
    }
}

/// 编排服务依赖的全部仓储
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub clients: Arc<dyn OAuth2ClientRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub consents: Arc<dyn ConsentRepository>,
    pub codes: Arc<dyn AuthorizationCodeRepository>,
    pub stores: Arc<dyn AuthorizationStoreRepository>,
    pub authentication_results: Arc<dyn AuthenticationResultRepository>,
    pub consent_results: Arc<dyn ConsentResultRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Repositories {
    /// 持久实体用给定仓储，临时实体统一放在 `cache` 中
    pub fn new(
        users: Arc<dyn UserRepository>,
        clients: Arc<dyn OAuth2ClientRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        consents: Arc<dyn ConsentRepository>,
        cache: CacheStore,
    ) -> Self {
        let cache = Arc::new(cache);
        Self {
            users,
            clients,
            refresh_tokens,
            consents,
            codes: cache.clone(),
            stores: cache.clone(),
            authentication_results: cache.clone(),
            consent_results: cache.clone(),
            sessions: cache,
        }
    }

    /// 单进程内存实现，用于开发与测试
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryClientRepository::new()),
            Arc::new(MemoryRefreshTokenRepository::new()),
            Arc::new(MemoryConsentRepository::new()),
            CacheStore::new(Arc::new(MemoryCache::new())),
        )
    }
}

pub struct OAuth2Service {
    pub(super) repos: Repositories,
    pub(super) vocabulary: Arc<ScopeVocabulary>,
    pub(super) tokens: TokenFactory,
    pub(super) signer: Arc<dyn TokenSigner>,
    pub(super) hasher: Arc<dyn SecretHasher>,
    pub(super) ids: Arc<SnowflakeGenerator>,
    pub(super) settings: ServiceSettings,
    dummy_hash: OnceLock<HashedSecret>,
}

impl OAuth2Service {
    pub fn new(
        repos: Repositories,
        vocabulary: Arc<ScopeVocabulary>,
        tokens: TokenFactory,
        signer: Arc<dyn TokenSigner>,
        hasher: Arc<dyn SecretHasher>,
        ids: Arc<SnowflakeGenerator>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            repos,
            vocabulary,
            tokens,
            signer,
            hasher,
            ids,
            settings,
            dummy_hash: OnceLock::new(),
        }
    }

    pub fn vocabulary(&self) -> &ScopeVocabulary {
        &self.vocabulary
    }

    pub fn signer(&self) -> &dyn TokenSigner {
        self.signer.as_ref()
    }

    /// 以配置的持久化超时为某个浏览器会话构造请求上下文
    pub fn context(&self, session_id: impl Into<String>) -> RequestContext {
        RequestContext::new(session_id, self.settings.flow.persistence_timeout)
    }

    pub(super) fn flow(&self) -> &FlowSettings {
        &self.settings.flow
    }

    pub(super) fn callback_secret_matches(&self, presented: &str) -> bool {
        let expected = self.settings.callback_secret.expose_secret().as_bytes();
        presented.as_bytes().ct_eq(expected).into()
    }

    /// 用户不存在时同样做一次哈希校验，与密码错误的耗时一致
    pub(super) fn verify_unknown_user(&self, password: &str) {
        let dummy = self.dummy_hash.get_or_init(|| {
            self.hasher.hash(DUMMY_PASSWORD).unwrap_or_else(|e| {
                warn!(error = %e, "Failed to prepare dummy password hash");
                HashedSecret::default()
            })
        });
        let _ = self.hasher.verify(password, dummy);
    }

    /// 尽力删除：实体自身带 TTL，删除失败只记录日志
    pub(super) async fn discard<F>(&self, ctx: &RequestContext, entity: &'static str, call: F)
    where
        F: Future<Output = AppResult<()>>,
    {
        if let Err(e) = ctx.run(call).await {
            warn!(entity, error = %e, "Best-effort delete failed");
        }
    }
}
