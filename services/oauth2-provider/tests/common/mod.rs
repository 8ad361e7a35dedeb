#![allow(dead_code)]

use std::sync::Arc;

use idp_common::{ClientId, SnowflakeGenerator, UserId};
use idp_errors::AppResult;
use idp_oauth2::application::{
    AuthenticationCallback, AuthorizeResponse, FlowSettings, OAuth2Service, RegisteredClient, Repositories,
    RequestContext, ServiceSettings,
};
use idp_oauth2::domain::flow::AuthorizeParams;
use idp_oauth2::domain::repositories::UserRepository;
use idp_oauth2::domain::scope::{ScopeVocabulary, Scopes};
use idp_oauth2::domain::secret::{HashedSecret, SecretHasher};
use idp_oauth2::domain::token::{TokenFactory, TokenLifetimes};
use idp_oauth2::domain::user::User;
use idp_oauth2::infrastructure::persistence::CacheStore;
use idp_oauth2::infrastructure::persistence::memory::{
    MemoryCache, MemoryClientRepository, MemoryConsentRepository, MemoryRefreshTokenRepository,
    MemoryUserRepository,
};
use idp_oauth2::infrastructure::signing::JwtSigner;
use sha2::{Digest, Sha256};

pub const CALLBACK_SECRET: &str = "front-end-shared-secret";
pub const REDIRECT_URI: &str = "https://app.example.com/callback";

/// 测试用快速哈希
#[derive(Debug, Default)]
pub struct Sha256Hasher;

impl SecretHasher for Sha256Hasher {
    fn hash(&self, plain: &str) -> AppResult<HashedSecret> {
        Ok(HashedSecret(hex::encode(Sha256::digest(plain.as_bytes()))))
    }

    fn verify(&self, plain: &str, hashed: &HashedSecret) -> AppResult<bool> {
        Ok(!hashed.is_empty() && self.hash(plain)?.as_str() == hashed.as_str())
    }
}

pub struct Harness {
    pub service: Arc<OAuth2Service>,
    pub users: MemoryUserRepository,
    pub refresh_tokens: MemoryRefreshTokenRepository,
    pub vocabulary: Arc<ScopeVocabulary>,
}

impl Harness {
    pub fn new() -> Self {
        let vocabulary = Arc::new(ScopeVocabulary::standard().unwrap());
        let ids = Arc::new(SnowflakeGenerator::new(3).unwrap());
        let users = MemoryUserRepository::new();
        let refresh_tokens = MemoryRefreshTokenRepository::new();

        let repos = Repositories::new(
            Arc::new(users.clone()),
            Arc::new(MemoryClientRepository::new()),
            Arc::new(refresh_tokens.clone()),
            Arc::new(MemoryConsentRepository::new()),
            CacheStore::new(Arc::new(MemoryCache::new())),
        );
        let tokens = TokenFactory::new(
            "https://id.example.com",
            TokenLifetimes {
                access: 3600,
                refresh: 86400,
                id: 3600,
            },
            ids.clone(),
        );

        let service = OAuth2Service::new(
            repos,
            vocabulary.clone(),
            tokens,
            Arc::new(JwtSigner::hmac(b"integration-secret").with_issuer("https://id.example.com")),
            Arc::new(Sha256Hasher),
            ids,
            ServiceSettings::new(FlowSettings::default(), CALLBACK_SECRET),
        );

        Self {
            service: Arc::new(service),
            users,
            refresh_tokens,
            vocabulary,
        }
    }

    pub fn ctx(&self, session_id: &str) -> RequestContext {
        self.service.context(session_id)
    }

    pub fn scopes(&self, raw: &str) -> Scopes {
        self.vocabulary.parse_scopes(raw)
    }

    pub async fn add_user(&self, id: i64, username: &str, password: &str, allowed_scope: &str) -> User {
        let user = User::new(
            UserId::from_i64(id),
            username,
            format!("{} display", username),
            Sha256Hasher.hash(password).unwrap(),
            self.scopes(allowed_scope),
        );
        self.users.create(&user).await.unwrap();
        user
    }

    pub async fn register_client(&self, owner: UserId, name: &str, is_confidential: bool) -> RegisteredClient {
        let ctx = self.ctx("owner-session").with_subject(owner, Scopes::empty());
        self.service
            .register_client(&ctx, name, is_confidential)
            .await
            .unwrap()
    }

    /// 完整走一遍：无会话 -> 身份前端登录 -> 会话更新，返回原始授权参数
    pub async fn login(&self, session_id: &str, params: AuthorizeParams, user_id: UserId) -> AuthorizeParams {
        let ctx = self.ctx(session_id);
        let store_id = match self.service.authorize(&ctx, params).await.unwrap() {
            AuthorizeResponse::RedirectToIdp { store_id } => store_id,
            other => panic!("expected redirect to identity provider, got {:?}", other),
        };

        let authentication_id = self
            .service
            .authentication_callback(&ctx, AuthenticationCallback::succeeded(store_id, CALLBACK_SECRET, user_id))
            .await
            .unwrap();

        self.service
            .session_update(&ctx, &authentication_id)
            .await
            .unwrap()
    }

    /// 已登录会话上发起授权并取得授权码
    pub async fn authorize_code(&self, session_id: &str, params: AuthorizeParams) -> String {
        match self.service.authorize(&self.ctx(session_id), params).await.unwrap() {
            AuthorizeResponse::Code { code, .. } => code,
            other => panic!("expected authorization code, got {:?}", other),
        }
    }
}

pub fn authorize_params(client_id: ClientId, scope: &str) -> AuthorizeParams {
    AuthorizeParams {
        response_type: "code".to_string(),
        client_id,
        redirect_uri: REDIRECT_URI.to_string(),
        scope: scope.to_string(),
        state: Some("xyz".to_string()),
        code_challenge: None,
        code_challenge_method: None,
    }
}
