//! 授权流程中的临时实体

use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use idp_common::{ClientId, UserId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::scope::Scopes;

/// 可过期的实体，TTL 由存储端根据 `expires_at` 计算
pub trait Expiring {
    fn expires_at(&self) -> DateTime<Utc>;
}

/// 32 字节随机数的 URL 安全 base64 编码
pub fn generate_opaque_id() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// 秒数转 TTL，超出范围时取最大值
pub fn ttl_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// `now + ttl`，溢出时取可表示的最晚时刻
pub fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// 令牌端点的授权类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    AuthorizationCode,
    Password,
    ClientCredentials,
    RefreshToken,
    /// 保留，未实现
    DeviceCode,
}

/// 授权类型标识符表
pub const GRANT_TYPES: [(&str, GrantType); 5] = [
    ("authorization_code", GrantType::AuthorizationCode),
    ("password", GrantType::Password),
    ("client_credentials", GrantType::ClientCredentials),
    ("refresh_token", GrantType::RefreshToken),
    ("urn:ietf:params:oauth:grant-type:device_code", GrantType::DeviceCode),
];

impl GrantType {
    pub fn parse(raw: &str) -> Option<Self> {
        GRANT_TYPES
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, grant)| *grant)
    }

    pub fn as_str(&self) -> &'static str {
        GRANT_TYPES
            .iter()
            .find(|(_, grant)| grant == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PKCE code_challenge_method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethod {
    #[serde(rename = "plain")]
    Plain,
    S256,
}

impl PkceMethod {
    pub fn transform(&self, verifier: &str) -> String {
        match self {
            Self::Plain => verifier.to_string(),
            Self::S256 => general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
        }
    }
}

impl FromStr for PkceMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "S256" => Ok(Self::S256),
            other => Err(format!("unsupported code_challenge_method: {other}")),
        }
    }
}

/// 原始授权请求参数，认证 / 同意完成后原样交还调用方重新发起授权
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeParams {
    pub response_type: String,
    pub client_id: ClientId,
    pub redirect_uri: String,
    pub scope: String,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<PkceMethod>,
}

/// 一次性授权码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2AuthorizationCode {
    pub code: String,
    pub user_id: UserId,
    pub client_id: ClientId,
    pub redirect_uri: String,
    /// 已收窄后的 scope
    pub scope: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<PkceMethod>,
    pub expires_at: DateTime<Utc>,
}

impl OAuth2AuthorizationCode {
    pub fn new(user_id: UserId, granted: &Scopes, params: &AuthorizeParams, ttl: Duration) -> Self {
        Self {
            code: generate_opaque_id(),
            user_id,
            client_id: params.client_id,
            redirect_uri: params.redirect_uri.clone(),
            scope: granted.to_string(),
            code_challenge: params.code_challenge.clone(),
            code_challenge_method: params.code_challenge_method,
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }

    pub fn has_pkce(&self) -> bool {
        self.code_challenge.is_some()
    }

    /// 校验 code_verifier；未声明方法时按 plain 处理
    pub fn verify_code_verifier(&self, verifier: &str) -> bool {
        match &self.code_challenge {
            Some(challenge) => {
                let method = self.code_challenge_method.unwrap_or(PkceMethod::Plain);
                method.transform(verifier).as_bytes().ct_eq(challenge.as_bytes()).into()
            }
            None => false,
        }
    }
}

impl Expiring for OAuth2AuthorizationCode {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// 授权存根的用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorePurpose {
    /// 等待外部身份前端认证
    Authentication,
    /// 等待用户同意
    Consent,
}

/// 挂起的授权请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2AuthorizationStore {
    pub id: String,
    pub purpose: StorePurpose,
    pub request: AuthorizeParams,
    /// 同意存根记录发起同意的用户；认证存根为 0
    pub user_id: UserId,
    pub has_authenticated: bool,
    pub expires_at: DateTime<Utc>,
}

impl OAuth2AuthorizationStore {
    pub fn for_authentication(request: AuthorizeParams, ttl: Duration) -> Self {
        Self {
            id: generate_opaque_id(),
            purpose: StorePurpose::Authentication,
            request,
            user_id: UserId::NONE,
            has_authenticated: false,
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }

    pub fn for_consent(request: AuthorizeParams, user_id: UserId, ttl: Duration) -> Self {
        Self {
            id: generate_opaque_id(),
            purpose: StorePurpose::Consent,
            request,
            user_id,
            has_authenticated: true,
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }

    pub fn mark_authenticated(&mut self) {
        self.has_authenticated = true;
    }
}

impl Expiring for OAuth2AuthorizationStore {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// 外部身份前端回报的认证结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2AuthenticationResult {
    pub id: String,
    pub store_id: String,
    pub success: bool,
    pub user_id: UserId,
    pub username: String,
    pub error: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl OAuth2AuthenticationResult {
    pub fn succeeded(store_id: &str, user_id: UserId, username: &str, ttl: Duration) -> Self {
        Self {
            id: generate_opaque_id(),
            store_id: store_id.to_string(),
            success: true,
            user_id,
            username: username.to_string(),
            error: None,
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }

    pub fn failed(store_id: &str, error: impl Into<String>, ttl: Duration) -> Self {
        Self {
            id: generate_opaque_id(),
            store_id: store_id.to_string(),
            success: false,
            user_id: UserId::NONE,
            username: String::new(),
            error: Some(error.into()),
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }
}

impl Expiring for OAuth2AuthenticationResult {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    FailedAuthentication,
}

/// 浏览器会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: SessionState,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn authenticated(user_id: UserId, ttl: Duration) -> Self {
        Self {
            state: SessionState::Authenticated,
            user_id,
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }

    pub fn failed(ttl: Duration) -> Self {
        Self {
            state: SessionState::FailedAuthentication,
            user_id: UserId::NONE,
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated && Utc::now() < self.expires_at
    }

    pub fn has_failed(&self) -> bool {
        self.state == SessionState::FailedAuthentication
    }

    /// 失败状态只生效一次，之后回到未认证
    pub fn reset(&mut self) {
        self.state = SessionState::Unauthenticated;
        self.user_id = UserId::NONE;
    }
}

impl Expiring for Session {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
