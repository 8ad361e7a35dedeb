//! 编排层请求 / 响应对象

use idp_common::{ClientId, UserId};
use serde::Serialize;

/// 授权端点的三种结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeResponse {
    /// 签发授权码，由调用方回跳到 `redirect_uri`
    Code {
        code: String,
        redirect_uri: String,
        state: Option<String>,
    },
    /// 需要到外部身份前端登录
    RedirectToIdp { store_id: String },
    /// 需要用户确认授权
    RedirectToConsent { store_id: String },
}

/// 外部身份前端回报的认证结果
#[derive(Debug, Clone)]
pub struct AuthenticationCallback {
    pub store_id: String,
    pub callback_secret: String,
    pub success: bool,
    pub user_id: UserId,
    pub error: Option<String>,
}

impl AuthenticationCallback {
    pub fn succeeded(store_id: impl Into<String>, callback_secret: impl Into<String>, user_id: UserId) -> Self {
        Self {
            store_id: store_id.into(),
            callback_secret: callback_secret.into(),
            success: true,
            user_id,
            error: None,
        }
    }

    pub fn failed(
        store_id: impl Into<String>,
        callback_secret: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            callback_secret: callback_secret.into(),
            success: false,
            user_id: UserId::NONE,
            error: Some(error.into()),
        }
    }
}

/// 令牌端点请求
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: ClientId,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,
}

impl TokenRequest {
    pub fn new(grant_type: impl Into<String>, client_id: ClientId) -> Self {
        Self {
            grant_type: grant_type.into(),
            client_id,
            client_secret: None,
            scope: None,
            code: None,
            redirect_uri: None,
            code_verifier: None,
            username: None,
            password: None,
            refresh_token: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_code_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(verifier.into());
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }
}

/// 令牌端点响应
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    pub scope: String,
}

/// 同意页面需要的信息
#[derive(Debug, Clone, Serialize)]
pub struct ConsentPrompt {
    pub store_id: String,
    pub client_id: ClientId,
    pub client_name: String,
    pub user_id: UserId,
    pub scope: String,
}

/// 新注册的客户端；明文密钥只在这里出现一次
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredClient {
    pub client_id: ClientId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub allowed_scope: String,
}
