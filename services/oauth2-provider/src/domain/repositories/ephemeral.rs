//! 临时实体仓储接口
//!
//! 写入时以实体自身的 `expires_at` 作为存储端 TTL，过期后读取返回 `None`。

use async_trait::async_trait;
use idp_common::{ClientId, UserId};
use idp_errors::AppResult;

use crate::domain::consent::OAuth2ConsentResult;
use crate::domain::flow::{
    OAuth2AuthenticationResult, OAuth2AuthorizationCode, OAuth2AuthorizationStore, Session,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationCodeRepository: Send + Sync {
    async fn save(&self, code: &OAuth2AuthorizationCode) -> AppResult<()>;

    async fn find(&self, code: &str) -> AppResult<Option<OAuth2AuthorizationCode>>;

    async fn delete(&self, code: &str) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationStoreRepository: Send + Sync {
    async fn save(&self, store: &OAuth2AuthorizationStore) -> AppResult<()>;

    async fn find(&self, id: &str) -> AppResult<Option<OAuth2AuthorizationStore>>;

    async fn delete(&self, id: &str) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthenticationResultRepository: Send + Sync {
    async fn save(&self, result: &OAuth2AuthenticationResult) -> AppResult<()>;

    async fn find(&self, id: &str) -> AppResult<Option<OAuth2AuthenticationResult>>;

    async fn delete(&self, id: &str) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsentResultRepository: Send + Sync {
    async fn save(&self, result: &OAuth2ConsentResult) -> AppResult<()>;

    async fn find(&self, user_id: UserId, client_id: ClientId) -> AppResult<Option<OAuth2ConsentResult>>;

    async fn delete(&self, user_id: UserId, client_id: ClientId) -> AppResult<()>;
}

/// 会话存储，按 cookie 中的会话 ID 索引
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load(&self, session_id: &str) -> AppResult<Option<Session>>;

    async fn save(&self, session_id: &str, session: &Session) -> AppResult<()>;
}
