//! 用户仓储接口

use async_trait::async_trait;
use idp_common::UserId;
use idp_errors::AppResult;

use crate::domain::user::User;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 创建用户，用户名重复时返回 `Conflict`
    async fn create(&self, user: &User) -> AppResult<()>;

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
}
