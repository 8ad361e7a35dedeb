//! 令牌端点：按授权类型分发

use idp_common::{ClientId, UserId};
use idp_errors::AppError;
use tracing::{debug, info, warn};

use super::context::RequestContext;
use super::dto::{TokenRequest, TokenResponse};
use super::error::{OAuth2Error, OAuth2Result};
use super::metrics::{record_refresh_token_theft, record_token_failure, record_tokens_issued};
use super::service::OAuth2Service;
use crate::domain::client::{ConfidentialRequirement, OAuth2Client};
use crate::domain::flow::GrantType;
use crate::domain::scope::Scopes;
use crate::domain::token::{OAuth2AccessToken, OAuth2RefreshToken};
use crate::domain::user::User;

const INVALID_CREDENTIALS: &str = "invalid username or password";

impl OAuth2Service {
    /// 令牌端点
    pub async fn token(&self, ctx: &RequestContext, request: TokenRequest) -> OAuth2Result<TokenResponse> {
        let grant_type = request.grant_type.clone();
        let result = self.token_request(ctx, request).await;

        if let Err(e) = &result {
            record_token_failure(&grant_type, e.error_code());
        }

        result
    }

    async fn token_request(&self, ctx: &RequestContext, request: TokenRequest) -> OAuth2Result<TokenResponse> {
        let grant = GrantType::parse(&request.grant_type).ok_or_else(|| {
            OAuth2Error::invalid_request(format!("Unknown grant_type: {}", request.grant_type))
        })?;

        let client = ctx
            .run(self.repos.clients.find_by_id(request.client_id))
            .await?
            .ok_or_else(|| OAuth2Error::invalid_client("Client not found"))?;

        let requested = self
            .vocabulary
            .parse_scopes(request.scope.as_deref().unwrap_or_default());
        if !requested.less_than_or_equal(&client.allowed_scope) {
            debug!(client_id = %client.id, "Requested scope exceeds client allowance");
            return Err(OAuth2Error::invalid_scope("Requested scope exceeds client allowed scope"));
        }

        match grant {
            GrantType::AuthorizationCode => self.grant_authorization_code(ctx, &client, &request).await,
            GrantType::Password => self.grant_password(ctx, &client, &request, &requested).await,
            GrantType::ClientCredentials => self.grant_client_credentials(&client, &request, &requested),
            GrantType::RefreshToken => self.grant_refresh_token(ctx, &client, &request).await,
            GrantType::DeviceCode => Err(OAuth2Error::unsupported_grant_type(grant.as_str())),
        }
    }

    async fn grant_authorization_code(
        &self,
        ctx: &RequestContext,
        client: &OAuth2Client,
        request: &TokenRequest,
    ) -> OAuth2Result<TokenResponse> {
        let raw_code = request
            .code
            .as_deref()
            .ok_or_else(|| OAuth2Error::invalid_request("code is required"))?;

        let code = ctx
            .run(self.repos.codes.find(raw_code))
            .await?
            .ok_or_else(|| OAuth2Error::invalid_grant("Authorization code not found or expired"))?;

        // 先删除再校验，失败的兑换同样消耗授权码
        self.discard(ctx, "authorization_code", self.repos.codes.delete(raw_code))
            .await;

        if code.client_id != client.id {
            return Err(OAuth2Error::invalid_grant("Authorization code was issued to another client"));
        }

        if request
            .redirect_uri
            .as_deref()
            .is_some_and(|uri| uri != code.redirect_uri)
        {
            return Err(OAuth2Error::invalid_grant("redirect_uri mismatch"));
        }

        if code.has_pkce() {
            let verifier = request
                .code_verifier
                .as_deref()
                .ok_or_else(|| OAuth2Error::invalid_grant("code_verifier is required"))?;
            if !code.verify_code_verifier(verifier) {
                debug!(client_id = %client.id, "PKCE verification failed");
                return Err(OAuth2Error::invalid_grant("Invalid code_verifier"));
            }
        } else {
            client.validate(
                request.client_id,
                request.client_secret.as_deref(),
                ConfidentialRequirement::RequireConfidential,
                self.hasher.as_ref(),
            )?;
        }

        let user = ctx
            .run(self.repos.users.find_by_id(code.user_id))
            .await?
            .ok_or_else(|| OAuth2Error::invalid_grant("Resource owner no longer exists"))?;

        // 用户的 scope 可能在签发授权码之后被收窄
        let granted = self
            .vocabulary
            .parse_scopes(&code.scope)
            .intersect(&user.allowed_scope);

        self.issue_user_tokens(ctx, GrantType::AuthorizationCode, client.id, &user, granted)
            .await
    }

    async fn grant_password(
        &self,
        ctx: &RequestContext,
        client: &OAuth2Client,
        request: &TokenRequest,
        requested: &Scopes,
    ) -> OAuth2Result<TokenResponse> {
        client.validate(
            request.client_id,
            request.client_secret.as_deref(),
            ConfidentialRequirement::RequireConfidential,
            self.hasher.as_ref(),
        )?;

        let (username, password) = match (request.username.as_deref(), request.password.as_deref()) {
            (Some(username), Some(password)) => (username, password),
            _ => return Err(OAuth2Error::invalid_request("username and password are required")),
        };

        let Some(user) = ctx.run(self.repos.users.find_by_username(username)).await? else {
            self.verify_unknown_user(password);
            debug!(client_id = %client.id, "Resource owner not found");
            return Err(OAuth2Error::invalid_grant(INVALID_CREDENTIALS));
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            debug!(client_id = %client.id, "Resource owner password rejected");
            return Err(OAuth2Error::invalid_grant(INVALID_CREDENTIALS));
        }

        let granted = requested.intersect(&user.allowed_scope);

        self.issue_user_tokens(ctx, GrantType::Password, client.id, &user, granted)
            .await
    }

    /// 仅签发访问令牌，主体为 0
    fn grant_client_credentials(
        &self,
        client: &OAuth2Client,
        request: &TokenRequest,
        requested: &Scopes,
    ) -> OAuth2Result<TokenResponse> {
        client.validate(
            request.client_id,
            request.client_secret.as_deref(),
            ConfidentialRequirement::RequireConfidential,
            self.hasher.as_ref(),
        )?;

        let granted = requested.intersect(&client.allowed_scope);
        let access = self
            .tokens
            .create_access_token(client.id, granted, UserId::NONE);
        let access_token = self.signer.generate(&access.claims())?;

        record_tokens_issued(GrantType::ClientCredentials.as_str(), false);
        info!(client_id = %client.id, scope = %access.scope, "Client credentials token issued");

        Ok(self.response(access, access_token, None, None))
    }

    async fn grant_refresh_token(
        &self,
        ctx: &RequestContext,
        client: &OAuth2Client,
        request: &TokenRequest,
    ) -> OAuth2Result<TokenResponse> {
        client.validate(
            request.client_id,
            request.client_secret.as_deref(),
            ConfidentialRequirement::DependOnClientConfidential,
            self.hasher.as_ref(),
        )?;

        let raw_token = request
            .refresh_token
            .as_deref()
            .ok_or_else(|| OAuth2Error::invalid_request("refresh_token is required"))?;

        let claims = match self.signer.validate(raw_token) {
            Ok(Some(claims)) => claims,
            Ok(None) => return Err(OAuth2Error::invalid_grant("Refresh token expired")),
            Err(AppError::Unauthorized(reason)) => {
                debug!(client_id = %client.id, %reason, "Malformed refresh token");
                return Err(OAuth2Error::invalid_grant("Invalid refresh token"));
            }
            Err(e) => return Err(e.into()),
        };

        let claims = claims
            .into_refresh()
            .ok_or_else(|| OAuth2Error::invalid_grant("Not a refresh token"))?;
        let current = OAuth2RefreshToken::from_claims(claims, &self.vocabulary);

        if current.metadata.audience != client.id {
            return Err(OAuth2Error::invalid_grant("Refresh token was issued to another client"));
        }

        let next = self.tokens.next_refresh_token(&current);
        let access = self.tokens.create_access_token(
            current.metadata.audience,
            current.scope.clone(),
            current.metadata.subject,
        );
        let access_token = self.signer.generate(&access.claims())?;
        let refresh_token = self.signer.generate(&next.claims())?;

        let lineage = current.metadata.id;
        match ctx
            .run(self.repos.refresh_tokens.rotate(lineage, current.sequence, access.metadata.id))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                // 该序号已被轮换过：旧令牌被重放，整条谱系作废
                warn!(%lineage, sequence = current.sequence, client_id = %client.id, "Refresh token reuse detected");
                record_refresh_token_theft();
                ctx.run(self.repos.refresh_tokens.delete(lineage)).await?;
                return Err(OAuth2Error::invalid_grant("Refresh token has been revoked"));
            }
            Err(e) => return Err(e.into()),
        }

        record_tokens_issued(GrantType::RefreshToken.as_str(), true);
        info!(client_id = %client.id, %lineage, sequence = next.sequence, "Refresh token rotated");

        Ok(self.response(access, access_token, Some(refresh_token), None))
    }

    /// 签发访问 + 刷新 + ID 令牌，并登记刷新令牌谱系
    async fn issue_user_tokens(
        &self,
        ctx: &RequestContext,
        grant: GrantType,
        audience: ClientId,
        user: &User,
        granted: Scopes,
    ) -> OAuth2Result<TokenResponse> {
        let access = self
            .tokens
            .create_access_token(audience, granted.clone(), user.id);
        let refresh = self.tokens.create_refresh_token(audience, granted, user.id);
        let id_token = self.tokens.create_id_token(audience, user);

        let access_token = self.signer.generate(&access.claims())?;
        let refresh_token = self.signer.generate(&refresh.claims())?;
        let id_token = self.signer.generate(&id_token.claims())?;

        ctx.run(
            self.repos
                .refresh_tokens
                .create(refresh.metadata.id, access.metadata.id),
        )
        .await?;

        record_tokens_issued(grant.as_str(), true);
        info!(client_id = %audience, user_id = %user.id, %grant, scope = %access.scope, "Tokens issued");

        Ok(self.response(access, access_token, Some(refresh_token), Some(id_token)))
    }

    fn response(
        &self,
        access: OAuth2AccessToken,
        access_token: String,
        refresh_token: Option<String>,
        id_token: Option<String>,
    ) -> TokenResponse {
        TokenResponse {
            access_token,
            token_type: self.signer.token_type().to_string(),
            expires_in: access.metadata.expires_in(),
            refresh_token,
            id_token,
            scope: access.scope.to_string(),
        }
    }
}
