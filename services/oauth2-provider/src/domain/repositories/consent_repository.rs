//! 同意记录仓储接口

use async_trait::async_trait;
use idp_common::{ClientId, UserId};
use idp_errors::AppResult;

use crate::domain::consent::OAuth2Consent;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsentRepository: Send + Sync {
    /// 按 (用户, 客户端) 插入或更新 scope 与有效期
    async fn upsert(&self, consent: &OAuth2Consent) -> AppResult<()>;

    async fn find(&self, user_id: UserId, client_id: ClientId) -> AppResult<Option<OAuth2Consent>>;
}
