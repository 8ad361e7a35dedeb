mod common;

use common::{Harness, REDIRECT_URI, authorize_params};
use idp_common::{ClientId, UserId};
use idp_oauth2::application::{AuthorizeResponse, RegisteredClient, TokenRequest};
use idp_oauth2::domain::user::User;

async fn third_party_setup(h: &Harness) -> (User, RegisteredClient) {
    let bob = h.add_user(2, "bob", "pw", "*:").await;
    let alice = h.add_user(1, "alice", "pw", "read:user write:user").await;
    let client = h.register_client(bob.id, "bobs app", true).await;
    (alice, client)
}

fn consent_store(response: AuthorizeResponse) -> String {
    match response {
        AuthorizeResponse::RedirectToConsent { store_id } => store_id,
        other => panic!("expected redirect to consent, got {:?}", other),
    }
}

#[tokio::test]
async fn test_third_party_client_requires_consent() {
    let h = Harness::new();
    let (alice, client) = third_party_setup(&h).await;
    let params = authorize_params(client.client_id, "read:user");
    let ctx = h.ctx("browser");

    let resumed = h.login("browser", params.clone(), alice.id).await;
    let store_id = consent_store(h.service.authorize(&ctx, resumed).await.unwrap());

    let prompt = h.service.get_consent(&ctx, &store_id).await.unwrap();
    assert_eq!(prompt.client_id, client.client_id);
    assert_eq!(prompt.client_name, "bobs app");
    assert_eq!(prompt.user_id, alice.id);
    assert_eq!(prompt.scope, "read:user");

    let resumed = h.service.update_consent(&ctx, &store_id, true).await.unwrap();
    assert_eq!(resumed, params);

    let code = h.authorize_code("browser", resumed.clone()).await;
    let response = h
        .service
        .token(
            &ctx,
            TokenRequest::new("authorization_code", client.client_id)
                .with_secret(client.client_secret.clone().unwrap())
                .with_code(code, REDIRECT_URI),
        )
        .await
        .unwrap();
    assert_eq!(response.scope, "read:user");

    // 持久同意记录在短期决定被消费后依然生效
    h.authorize_code("browser", resumed).await;

    // 超出已同意范围则重新询问
    let wider = authorize_params(client.client_id, "read:user write:user");
    consent_store(h.service.authorize(&ctx, wider).await.unwrap());
}

#[tokio::test]
async fn test_denied_consent() {
    let h = Harness::new();
    let (alice, client) = third_party_setup(&h).await;
    let params = authorize_params(client.client_id, "read:user");
    let ctx = h.ctx("browser");

    let resumed = h.login("browser", params.clone(), alice.id).await;
    let store_id = consent_store(h.service.authorize(&ctx, resumed).await.unwrap());

    let resumed = h.service.update_consent(&ctx, &store_id, false).await.unwrap();
    let err = h.service.authorize(&ctx, resumed).await.unwrap_err();
    assert_eq!(err.error_code(), "access_denied");

    // 拒绝决定只生效一次
    consent_store(h.service.authorize(&ctx, params).await.unwrap());
}

#[tokio::test]
async fn test_consent_store_is_bound_to_session() {
    let h = Harness::new();
    let (alice, client) = third_party_setup(&h).await;
    let params = authorize_params(client.client_id, "read:user");

    let resumed = h.login("browser", params, alice.id).await;
    let store_id = consent_store(h.service.authorize(&h.ctx("browser"), resumed).await.unwrap());

    let err = h
        .service
        .get_consent(&h.ctx("someone-else"), &store_id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "access_denied");

    h.service
        .update_consent(&h.ctx("browser"), &store_id, true)
        .await
        .unwrap();
    let err = h
        .service
        .update_consent(&h.ctx("browser"), &store_id, true)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_request");
}

#[tokio::test]
async fn test_client_view_projection() {
    let h = Harness::new();
    let (alice, client) = third_party_setup(&h).await;

    let stranger = h.ctx("s").with_subject(alice.id, h.scopes("read:user"));
    let view = h.service.get_client(&stranger, client.client_id).await.unwrap();
    assert_eq!(view.name, "bobs app");
    assert_eq!(view.allowed_scope, None);
    assert_eq!(view.owner_id, None);

    let owner = h.ctx("s").with_subject(UserId::from_i64(2), h.scopes(""));
    let view = h.service.get_client(&owner, client.client_id).await.unwrap();
    assert_eq!(view.allowed_scope.as_deref(), Some("*:"));

    let err = h
        .service
        .get_client(&owner, ClientId::from_i64(12345))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "not_found");

    let me = h.service.get_user(&stranger, alice.id).await.unwrap();
    assert_eq!(me.allowed_scope.as_deref(), Some("read:user write:user"));
    let bob = h.service.get_user(&stranger, UserId::from_i64(2)).await.unwrap();
    assert_eq!(bob.display_name.as_deref(), Some("bob display"));
    assert_eq!(bob.allowed_scope, None);

    let unscoped = h.ctx("s").with_subject(alice.id, h.scopes(""));
    let bob = h.service.get_user(&unscoped, UserId::from_i64(2)).await.unwrap();
    assert_eq!(bob.display_name, None);
}

#[tokio::test]
async fn test_register_client_requires_known_owner() {
    let h = Harness::new();
    let anonymous = h.ctx("s");
    let err = h
        .service
        .register_client(&anonymous, "some app", true)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "access_denied");

    h.add_user(1, "alice", "pw", "*:").await;
    let owner = h.ctx("s").with_subject(UserId::from_i64(1), h.scopes(""));
    let err = h.service.register_client(&owner, "x", true).await.unwrap_err();
    assert_eq!(err.error_code(), "invalid_request");
}
