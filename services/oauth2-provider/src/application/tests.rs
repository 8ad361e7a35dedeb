use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use idp_common::{ClientId, SnowflakeGenerator, UserId};
use idp_config::FlowConfig;
use idp_errors::AppError;

use super::*;
use crate::domain::client::OAuth2Client;
use crate::domain::flow::{AuthorizeParams, OAuth2AuthorizationCode};
use crate::domain::repositories::client_repository::MockOAuth2ClientRepository;
use crate::domain::repositories::ephemeral::{MockAuthorizationCodeRepository, MockSessionRepository};
use crate::domain::repositories::refresh_token_repository::MockRefreshTokenRepository;
use crate::domain::scope::ScopeVocabulary;
use crate::domain::secret::{HashedSecret, MockSecretHasher};
use crate::domain::token::{TokenFactory, TokenLifetimes};
use crate::infrastructure::signing::JwtSigner;

const CLIENT: i64 = 40;
const USER: i64 = 41;

fn vocabulary() -> ScopeVocabulary {
    ScopeVocabulary::standard().unwrap()
}

fn public_client() -> OAuth2Client {
    OAuth2Client {
        id: ClientId::from_i64(CLIENT),
        owner_id: UserId::from_i64(USER),
        name: "mobile".to_string(),
        is_confidential: false,
        hashed_secret: HashedSecret::default(),
        allowed_scope: vocabulary().full_scope(),
        updated_at: Utc::now(),
    }
}

fn clients_returning(client: OAuth2Client) -> MockOAuth2ClientRepository {
    let mut clients = MockOAuth2ClientRepository::new();
    clients
        .expect_find_by_id()
        .returning(move |_| Ok(Some(client.clone())));
    clients
}

fn service(repos: Repositories) -> OAuth2Service {
    service_with(repos, MockSecretHasher::new(), FlowSettings::default())
}

fn service_with(repos: Repositories, hasher: MockSecretHasher, flow: FlowSettings) -> OAuth2Service {
    let ids = Arc::new(SnowflakeGenerator::new(1).unwrap());
    let tokens = TokenFactory::new(
        "https://id.example.com",
        TokenLifetimes {
            access: 3600,
            refresh: 86400,
            id: 3600,
        },
        ids.clone(),
    );

    OAuth2Service::new(
        repos,
        Arc::new(vocabulary()),
        tokens,
        Arc::new(JwtSigner::hmac(b"unit-test-secret")),
        Arc::new(hasher),
        ids,
        ServiceSettings::new(flow, "callback-secret"),
    )
}

fn ctx() -> RequestContext {
    RequestContext::new("session", Duration::from_secs(1))
}

fn params() -> AuthorizeParams {
    AuthorizeParams {
        response_type: "code".to_string(),
        client_id: ClientId::from_i64(CLIENT),
        redirect_uri: "https://app.example.com/cb".to_string(),
        scope: "read:user".to_string(),
        state: None,
        code_challenge: None,
        code_challenge_method: None,
    }
}

#[tokio::test]
async fn test_client_lookup_failure_is_server_error() {
    let mut clients = MockOAuth2ClientRepository::new();
    clients
        .expect_find_by_id()
        .returning(|_| Err(AppError::database("connection reset")));

    let mut repos = Repositories::in_memory();
    repos.clients = Arc::new(clients);

    let err = service(repos)
        .token(&ctx(), TokenRequest::new("password", ClientId::from_i64(CLIENT)))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "server_error");
}

#[tokio::test]
async fn test_session_store_failure_is_server_error() {
    let mut sessions = MockSessionRepository::new();
    sessions
        .expect_load()
        .returning(|_| Err(AppError::external_service("redis unavailable")));

    let mut repos = Repositories::in_memory();
    repos.clients = Arc::new(clients_returning(public_client()));
    repos.sessions = Arc::new(sessions);

    let err = service(repos).authorize(&ctx(), params()).await.unwrap_err();
    assert!(err.is_server_error());
}

#[tokio::test]
async fn test_failed_code_delete_does_not_block_validation() {
    let code = OAuth2AuthorizationCode::new(
        UserId::from_i64(USER),
        &vocabulary().parse_scopes("read:user"),
        &AuthorizeParams {
            client_id: ClientId::from_i64(999),
            ..params()
        },
        chrono::Duration::seconds(60),
    );
    let raw = code.code.clone();

    let mut codes = MockAuthorizationCodeRepository::new();
    codes.expect_find().returning(move |_| Ok(Some(code.clone())));
    codes
        .expect_delete()
        .times(1)
        .returning(|_| Err(AppError::external_service("redis unavailable")));

    let mut repos = Repositories::in_memory();
    repos.clients = Arc::new(clients_returning(public_client()));
    repos.codes = Arc::new(codes);

    let request = TokenRequest::new("authorization_code", ClientId::from_i64(CLIENT))
        .with_code(raw, "https://app.example.com/cb");
    let err = service(repos).token(&ctx(), request).await.unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

fn refresh_token_for(service: &OAuth2Service) -> String {
    let token = service.tokens.create_refresh_token(
        ClientId::from_i64(CLIENT),
        vocabulary().parse_scopes("read:user"),
        UserId::from_i64(USER),
    );
    service.signer.generate(&token.claims()).unwrap()
}

#[tokio::test]
async fn test_rotation_miss_deletes_lineage() {
    let mut refresh_tokens = MockRefreshTokenRepository::new();
    refresh_tokens
        .expect_rotate()
        .withf(|_, expected_seq, _| *expected_seq == 0)
        .times(1)
        .returning(|_, _, _| Err(AppError::not_found("Refresh token not found")));
    refresh_tokens.expect_delete().times(1).returning(|_| Ok(()));

    let mut repos = Repositories::in_memory();
    repos.clients = Arc::new(clients_returning(public_client()));
    repos.refresh_tokens = Arc::new(refresh_tokens);

    let service = service(repos);
    let request =
        TokenRequest::new("refresh_token", ClientId::from_i64(CLIENT)).with_refresh_token(refresh_token_for(&service));

    let err = service.token(&ctx(), request).await.unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

#[tokio::test]
async fn test_rotation_fault_keeps_lineage() {
    let mut refresh_tokens = MockRefreshTokenRepository::new();
    refresh_tokens
        .expect_rotate()
        .returning(|_, _, _| Err(AppError::database("deadlock detected")));
    refresh_tokens.expect_delete().never();

    let mut repos = Repositories::in_memory();
    repos.clients = Arc::new(clients_returning(public_client()));
    repos.refresh_tokens = Arc::new(refresh_tokens);

    let service = service(repos);
    let request =
        TokenRequest::new("refresh_token", ClientId::from_i64(CLIENT)).with_refresh_token(refresh_token_for(&service));

    let err = service.token(&ctx(), request).await.unwrap_err();
    assert!(err.is_server_error());
}

#[tokio::test]
async fn test_grant_type_classification() {
    let mut repos = Repositories::in_memory();
    repos.clients = Arc::new(clients_returning(public_client()));
    let service = service(repos);

    let err = service
        .token(
            &ctx(),
            TokenRequest::new("urn:ietf:params:oauth:grant-type:device_code", ClientId::from_i64(CLIENT)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "unsupported_grant_type");

    let err = service
        .token(&ctx(), TokenRequest::new("implicit", ClientId::from_i64(CLIENT)))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_request");
}

#[test]
fn test_context_uses_persistence_timeout() {
    let service = service(Repositories::in_memory());
    let ctx = service.context("browser-session");

    assert_eq!(ctx.session_id(), "browser-session");
    assert_eq!(ctx.timeout(), Duration::from_millis(5000));
    assert!(ctx.subject().is_none());
}

fn confidential_client() -> OAuth2Client {
    OAuth2Client {
        is_confidential: true,
        hashed_secret: HashedSecret::from_hash("client-hash"),
        ..public_client()
    }
}

#[tokio::test]
async fn test_unknown_user_still_verifies_password() {
    let mut hasher = MockSecretHasher::new();
    hasher
        .expect_verify()
        .withf(|plain, _| plain == "client-secret")
        .times(2)
        .returning(|_, _| Ok(true));
    hasher
        .expect_hash()
        .times(1)
        .returning(|_| Ok(HashedSecret::from_hash("placeholder-hash")));
    hasher
        .expect_verify()
        .withf(|plain, hashed| plain == "guess" && hashed.as_str() == "placeholder-hash")
        .times(2)
        .returning(|_, _| Ok(false));

    let mut repos = Repositories::in_memory();
    repos.clients = Arc::new(clients_returning(confidential_client()));
    let service = service_with(repos, hasher, FlowSettings::default());

    for _ in 0..2 {
        let request = TokenRequest::new("password", ClientId::from_i64(CLIENT))
            .with_secret("client-secret")
            .with_credentials("nobody", "guess");
        let err = service.token(&ctx(), request).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
    }
}

#[test]
fn test_callback_secret_must_match_exactly() {
    let service = service(Repositories::in_memory());

    assert!(service.callback_secret_matches("callback-secret"));
    assert!(!service.callback_secret_matches("callback-secreT"));
    assert!(!service.callback_secret_matches("callback-secret-extra"));
    assert!(!service.callback_secret_matches("callback"));
    assert!(!service.callback_secret_matches(""));
}

#[tokio::test]
async fn test_unbounded_flow_ttls_do_not_panic() {
    let config = FlowConfig {
        authorization_store_ttl: u64::MAX,
        authentication_result_ttl: u64::MAX,
        session_ttl: u64::MAX,
        ..FlowConfig::default()
    };

    let mut repos = Repositories::in_memory();
    repos.clients = Arc::new(clients_returning(public_client()));
    let service = service_with(repos, MockSecretHasher::new(), FlowSettings::from(&config));

    let store_id = match service.authorize(&ctx(), params()).await.unwrap() {
        AuthorizeResponse::RedirectToIdp { store_id } => store_id,
        other => panic!("unexpected response: {:?}", other),
    };

    let authentication_id = service
        .authentication_callback(
            &ctx(),
            AuthenticationCallback::failed(store_id, "callback-secret", "locked out"),
        )
        .await
        .unwrap();
    let resumed = service.session_update(&ctx(), &authentication_id).await.unwrap();
    assert_eq!(resumed, params());

    let err = service.authorize(&ctx(), params()).await.unwrap_err();
    assert_eq!(err.error_code(), "access_denied");
}
