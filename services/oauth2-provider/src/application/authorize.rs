//! 授权端点、登录回调、会话更新与同意交接

use tracing::{debug, info};
use url::Url;

use super::context::RequestContext;
use super::dto::{AuthenticationCallback, AuthorizeResponse, ConsentPrompt};
use super::error::{OAuth2Error, OAuth2Result};
use super::metrics::record_authorize_outcome;
use super::service::OAuth2Service;
use crate::domain::client::OAuth2Client;
use crate::domain::consent::{OAuth2Consent, OAuth2ConsentResult};
use crate::domain::flow::{
    AuthorizeParams, OAuth2AuthenticationResult, OAuth2AuthorizationCode, OAuth2AuthorizationStore,
    Session, StorePurpose,
};
use crate::domain::scope::Scopes;
use crate::domain::user::User;

const RESPONSE_TYPE_CODE: &str = "code";

impl OAuth2Service {
    /// 授权端点
    pub async fn authorize(&self, ctx: &RequestContext, params: AuthorizeParams) -> OAuth2Result<AuthorizeResponse> {
        let result = self.authorize_request(ctx, params).await;

        let outcome = match &result {
            Ok(AuthorizeResponse::Code { .. }) => "code",
            Ok(AuthorizeResponse::RedirectToIdp { .. }) => "redirect_idp",
            Ok(AuthorizeResponse::RedirectToConsent { .. }) => "redirect_consent",
            Err(e) => e.error_code(),
        };
        record_authorize_outcome(outcome);

        result
    }

    async fn authorize_request(
        &self,
        ctx: &RequestContext,
        params: AuthorizeParams,
    ) -> OAuth2Result<AuthorizeResponse> {
        Url::parse(&params.redirect_uri)
            .map_err(|e| OAuth2Error::invalid_request(format!("Invalid redirect_uri: {}", e)))?;

        if params.response_type != RESPONSE_TYPE_CODE {
            return Err(OAuth2Error::invalid_request(format!(
                "Unsupported response_type: {}",
                params.response_type
            )));
        }

        let client = self.load_client(ctx, &params).await?;
        let requested = self.vocabulary.parse_scopes(&params.scope);
        if !requested.less_than_or_equal(&client.allowed_scope) {
            debug!(client_id = %client.id, scope = %params.scope, "Requested scope exceeds client allowance");
            return Err(OAuth2Error::invalid_scope("Requested scope exceeds client allowed scope"));
        }

        let session = ctx.run(self.repos.sessions.load(ctx.session_id())).await?;
        let user_id = match session {
            Some(mut session) if session.has_failed() => {
                session.reset();
                ctx.run(self.repos.sessions.save(ctx.session_id(), &session))
                    .await?;
                debug!(client_id = %client.id, "Previous authentication failed");
                return Err(OAuth2Error::access_denied("Authentication failed"));
            }
            Some(session) if session.is_authenticated() => session.user_id,
            _ => {
                let store = OAuth2AuthorizationStore::for_authentication(params, self.flow().authorization_store_ttl);
                ctx.run(self.repos.stores.save(&store)).await?;
                debug!(client_id = %client.id, "No session, redirecting to identity provider");
                return Ok(AuthorizeResponse::RedirectToIdp { store_id: store.id });
            }
        };

        let user = ctx
            .run(self.repos.users.find_by_id(user_id))
            .await?
            .ok_or_else(|| OAuth2Error::access_denied("Session user no longer exists"))?;

        if client.owner_id != user.id && !self.has_consent(ctx, &client, &user, &requested).await? {
            let store = OAuth2AuthorizationStore::for_consent(params, user.id, self.flow().authorization_store_ttl);
            ctx.run(self.repos.stores.save(&store)).await?;
            debug!(client_id = %client.id, user_id = %user.id, "Consent required");
            return Ok(AuthorizeResponse::RedirectToConsent { store_id: store.id });
        }

        let granted = requested.intersect(&user.allowed_scope);
        let code = OAuth2AuthorizationCode::new(user.id, &granted, &params, self.flow().authorization_code_ttl);
        ctx.run(self.repos.codes.save(&code)).await?;

        info!(client_id = %client.id, user_id = %user.id, scope = %granted, "Authorization code issued");

        Ok(AuthorizeResponse::Code {
            code: code.code,
            redirect_uri: params.redirect_uri,
            state: params.state,
        })
    }

    async fn load_client(&self, ctx: &RequestContext, params: &AuthorizeParams) -> OAuth2Result<OAuth2Client> {
        ctx.run(self.repos.clients.find_by_id(params.client_id))
            .await?
            .ok_or_else(|| OAuth2Error::invalid_client("Client not found"))
    }

    /// 第三方客户端：刚做出的决定优先，其次是持久同意记录
    async fn has_consent(
        &self,
        ctx: &RequestContext,
        client: &OAuth2Client,
        user: &User,
        requested: &Scopes,
    ) -> OAuth2Result<bool> {
        let decision = ctx
            .run(self.repos.consent_results.find(user.id, client.id))
            .await?;

        if let Some(decision) = decision {
            self.discard(ctx, "consent_result", self.repos.consent_results.delete(user.id, client.id))
                .await;

            if !decision.is_accepted() {
                debug!(client_id = %client.id, user_id = %user.id, "User denied consent");
                return Err(OAuth2Error::access_denied("User denied consent"));
            }
            return Ok(true);
        }

        let consent = ctx.run(self.repos.consents.find(user.id, client.id)).await?;

        Ok(consent.is_some_and(|consent| consent.validate(requested).is_ok()))
    }

    /// 外部身份前端的登录回调，返回认证结果 ID
    pub async fn authentication_callback(
        &self,
        ctx: &RequestContext,
        callback: AuthenticationCallback,
    ) -> OAuth2Result<String> {
        if !self.callback_secret_matches(&callback.callback_secret) {
            debug!(store_id = %callback.store_id, "Identity provider secret mismatch");
            return Err(OAuth2Error::invalid_client("Identity provider is not trusted"));
        }

        let mut store = ctx
            .run(self.repos.stores.find(&callback.store_id))
            .await?
            .filter(|store| store.purpose == StorePurpose::Authentication)
            .ok_or_else(|| OAuth2Error::invalid_request("Authorization store not found"))?;

        if store.has_authenticated {
            debug!(store_id = %store.id, "Repeated authentication callback");
            return Err(OAuth2Error::invalid_request("Authorization store already authenticated"));
        }

        store.mark_authenticated();
        ctx.run(self.repos.stores.save(&store)).await?;

        let ttl = self.flow().authentication_result_ttl;
        let result = if callback.success {
            match ctx.run(self.repos.users.find_by_id(callback.user_id)).await? {
                Some(user) => OAuth2AuthenticationResult::succeeded(&store.id, user.id, &user.username, ttl),
                None => OAuth2AuthenticationResult::failed(&store.id, "User not found", ttl),
            }
        } else {
            let reason = callback.error.unwrap_or_else(|| "Authentication failed".to_string());
            OAuth2AuthenticationResult::failed(&store.id, reason, ttl)
        };

        ctx.run(self.repos.authentication_results.save(&result)).await?;

        info!(store_id = %store.id, success = result.success, "Authentication result recorded");

        Ok(result.id)
    }

    /// 消费认证结果并写入会话，返回原始授权参数供重新发起授权
    pub async fn session_update(&self, ctx: &RequestContext, authentication_id: &str) -> OAuth2Result<AuthorizeParams> {
        let result = ctx
            .run(self.repos.authentication_results.find(authentication_id))
            .await?
            .ok_or_else(|| OAuth2Error::invalid_request("Authentication result not found"))?;

        self.discard(
            ctx,
            "authentication_result",
            self.repos.authentication_results.delete(authentication_id),
        )
        .await;

        let store = ctx
            .run(self.repos.stores.find(&result.store_id))
            .await?
            .ok_or_else(|| OAuth2Error::invalid_request("Authorization store not found"))?;

        self.discard(ctx, "authorization_store", self.repos.stores.delete(&store.id))
            .await;

        let session = if result.success {
            Session::authenticated(result.user_id, self.flow().session_ttl)
        } else {
            Session::failed(self.flow().session_ttl)
        };
        ctx.run(self.repos.sessions.save(ctx.session_id(), &session))
            .await?;

        info!(user_id = %result.user_id, success = result.success, "Session updated");

        Ok(store.request)
    }

    /// 同意页面：读取待确认的授权请求
    pub async fn get_consent(&self, ctx: &RequestContext, store_id: &str) -> OAuth2Result<ConsentPrompt> {
        let store = self.load_consent_store(ctx, store_id).await?;
        let client = self.load_client(ctx, &store.request).await?;

        Ok(ConsentPrompt {
            store_id: store.id,
            client_id: client.id,
            client_name: client.name,
            user_id: store.user_id,
            scope: store.request.scope,
        })
    }

    /// 记录同意 / 拒绝，返回原始授权参数供重新发起授权
    pub async fn update_consent(
        &self,
        ctx: &RequestContext,
        store_id: &str,
        accepted: bool,
    ) -> OAuth2Result<AuthorizeParams> {
        let store = self.load_consent_store(ctx, store_id).await?;
        self.discard(ctx, "authorization_store", self.repos.stores.delete(&store.id))
            .await;

        let user_id = store.user_id;
        let client_id = store.request.client_id;
        let ttl = self.flow().consent_result_ttl;

        let decision = if accepted {
            let scope = self.vocabulary.parse_scopes(&store.request.scope);
            let consent = OAuth2Consent::new(user_id, client_id, scope, self.flow().consent_ttl);
            ctx.run(self.repos.consents.upsert(&consent)).await?;
            OAuth2ConsentResult::accepted(user_id, client_id, ttl)
        } else {
            OAuth2ConsentResult::denied(user_id, client_id, ttl)
        };
        ctx.run(self.repos.consent_results.save(&decision)).await?;

        info!(%user_id, %client_id, accepted, "Consent updated");

        Ok(store.request)
    }

    /// 同意存储只对其所属的已登录用户可见
    async fn load_consent_store(&self, ctx: &RequestContext, store_id: &str) -> OAuth2Result<OAuth2AuthorizationStore> {
        let store = ctx
            .run(self.repos.stores.find(store_id))
            .await?
            .filter(|store| store.purpose == StorePurpose::Consent)
            .ok_or_else(|| OAuth2Error::invalid_request("Consent request not found"))?;

        let session = ctx.run(self.repos.sessions.load(ctx.session_id())).await?;
        match session {
            Some(session) if session.is_authenticated() && session.user_id == store.user_id => Ok(store),
            _ => Err(OAuth2Error::access_denied("Consent belongs to another session")),
        }
    }
}
