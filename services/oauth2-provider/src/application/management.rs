//! 客户端注册与只读视图

use idp_common::{ClientId, UserId};
use tracing::info;

use super::context::RequestContext;
use super::dto::RegisteredClient;
use super::error::{OAuth2Error, OAuth2Result};
use super::service::OAuth2Service;
use crate::domain::client::OAuth2Client;
use crate::domain::projection::{ClientView, UserView};

impl OAuth2Service {
    /// 注册客户端，所有者为当前主体
    pub async fn register_client(
        &self,
        ctx: &RequestContext,
        name: &str,
        is_confidential: bool,
    ) -> OAuth2Result<RegisteredClient> {
        let owner = ctx
            .run(self.repos.users.find_by_id(ctx.subject()))
            .await?
            .ok_or_else(|| OAuth2Error::access_denied("Authenticated user required"))?;

        let id = ClientId(self.ids.generate());
        let (client, client_secret) = OAuth2Client::create(
            id,
            owner.id,
            name,
            is_confidential,
            &self.vocabulary,
            self.hasher.as_ref(),
        )?;

        ctx.run(self.repos.clients.create(&client)).await?;

        info!(client_id = %client.id, owner_id = %owner.id, is_confidential, "Client registered");

        Ok(RegisteredClient {
            client_id: client.id,
            client_secret,
            allowed_scope: client.allowed_scope.to_string(),
        })
    }

    pub async fn get_client(&self, ctx: &RequestContext, id: ClientId) -> OAuth2Result<ClientView> {
        let client = ctx
            .run(self.repos.clients.find_by_id(id))
            .await?
            .ok_or_else(|| OAuth2Error::not_found(format!("Client {} not found", id)))?;

        Ok(ClientView::project(&client, ctx.viewer(), &self.vocabulary))
    }

    pub async fn get_user(&self, ctx: &RequestContext, id: UserId) -> OAuth2Result<UserView> {
        let user = ctx
            .run(self.repos.users.find_by_id(id))
            .await?
            .ok_or_else(|| OAuth2Error::not_found(format!("User {} not found", id)))?;

        Ok(UserView::project(&user, ctx.viewer(), &self.vocabulary))
    }
}
