//! OAuth2 客户端仓储接口

use async_trait::async_trait;
use idp_common::ClientId;
use idp_errors::AppResult;

use crate::domain::client::OAuth2Client;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuth2ClientRepository: Send + Sync {
    async fn create(&self, client: &OAuth2Client) -> AppResult<()>;

    async fn find_by_id(&self, id: ClientId) -> AppResult<Option<OAuth2Client>>;
}
