mod common;

use std::sync::Arc;
use std::time::Duration;

use blood_portal::dto::LoginUserDto;
use blood_portal::{
    ApiClient, ApiConfig, ApiError, EntityId, MemoryTokenStore, StoredCredentialToken, TokenStore,
    user_token_is_expired,
};
use serde_json::json;

use common::{JWT_SECRET, dead_backend, now, sign_token, spawn_backend};

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(ApiConfig::new(base_url.parse().unwrap()))
}

fn ok_login() -> LoginUserDto {
    LoginUserDto::new("ok@example.com", "Secret#123")
}

#[tokio::test]
async fn sign_in_stores_token_and_expiry() {
    let client = client(&spawn_backend().await);

    let stored = client.sign_in(&ok_login()).await.unwrap();
    let expiry = stored.expiry_epoch_millis.unwrap();
    assert!(expiry > now() * 1000);
    assert_eq!(stored.cached_user.as_ref().unwrap().email, "ok@example.com");

    let loaded = client.token_store().load().unwrap();
    assert_eq!(loaded, stored);
    assert!(!user_token_is_expired(Some(&loaded), now() * 1000));
}

#[tokio::test]
async fn authenticated_calls_use_stored_token() {
    let client = client(&spawn_backend().await);
    client.sign_in(&ok_login()).await.unwrap();

    let user = client.me().await.unwrap();
    assert_eq!(user.first_name.as_deref(), Some("Efua"));

    let updated = client.update_me(&json!({ "firstName": "Ama" })).await.unwrap();
    assert_eq!(updated.first_name.as_deref(), Some("Ama"));
}

#[tokio::test]
async fn authenticated_call_without_token_is_not_sent() {
    let client = client(&spawn_backend().await);

    let err = client.me().await.unwrap_err();
    assert!(matches!(err, ApiError::AuthenticationRequired));
}

#[tokio::test]
async fn expired_token_is_cleared_and_call_refused() {
    let store = Arc::new(MemoryTokenStore::with_token(StoredCredentialToken::new(
        sign_token(JWT_SECRET, now() + 3600),
        (now() - 10) * 1000,
    )));
    let client = client(&spawn_backend().await).with_token_store(store.clone());

    let err = client.donors().list().await.unwrap_err();
    assert!(matches!(err, ApiError::AuthenticationRequired));
    assert!(store.load().is_none());
}

#[tokio::test]
async fn sign_out_forgets_token() {
    let client = client(&spawn_backend().await);
    client.sign_in(&ok_login()).await.unwrap();

    client.sign_out();
    assert!(client.token_store().load().is_none());
    assert!(matches!(
        client.me().await.unwrap_err(),
        ApiError::AuthenticationRequired
    ));
}

#[tokio::test]
async fn rejected_login_carries_backend_errors() {
    let client = client(&spawn_backend().await);

    let err = client
        .sign_in(&LoginUserDto::new("wrong@example.com", "nope"))
        .await
        .unwrap_err();
    match &err {
        ApiError::Backend { status, errors } => {
            assert_eq!(*status, 422);
            assert_eq!(errors, &json!({ "password": "incorrectPassword" }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.login_message(), "Email ou mot de passe incorrect !");
    assert!(client.token_store().load().is_none());
}

#[tokio::test]
async fn server_failure_login_message() {
    let client = client(&spawn_backend().await);

    let err = client
        .login_email(&LoginUserDto::new("crash@example.com", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.login_message(), "Une erreur est survenue, Veuillez réessayer !");
}

#[tokio::test]
async fn paged_and_plain_lists_decode() {
    let client = client(&spawn_backend().await);
    client.sign_in(&ok_login()).await.unwrap();

    let donors = client.donors().list().await.unwrap();
    assert_eq!(donors.len(), 2);
    assert_eq!(donors[0].full_name(), "Kwame Nkrumah");

    let hospitals = client.hospitals().list().await.unwrap();
    assert_eq!(hospitals.len(), 1);
    assert_eq!(hospitals[0].name, "CHU Campus");
}

#[tokio::test]
async fn get_single_entity_and_missing_one() {
    let client = client(&spawn_backend().await);
    client.sign_in(&ok_login()).await.unwrap();

    let donor = client.donors().get(&EntityId::from("12")).await.unwrap();
    assert_eq!(donor.id.as_str(), "12");

    let err = client.donors().get(&EntityId::from("404")).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn entity_id_stays_inside_its_collection() {
    let client = client(&spawn_backend().await);
    client.sign_in(&ok_login()).await.unwrap();

    let donor = client.donors().get(&EntityId::from("a/b?c")).await.unwrap();
    assert_eq!(donor.id.as_str(), "a/b?c");
}

#[tokio::test]
async fn unreachable_backend() {
    let client = client(&dead_backend().await);

    let err = client.login_email(&ok_login()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unreachable(_)));
    assert_eq!(err.login_message(), "Une erreur est survenue, Veuillez réessayer !");
}

#[tokio::test]
async fn slow_backend_times_out() {
    let base_url = spawn_backend().await;
    let client = ApiClient::new(
        ApiConfig::new(base_url.parse().unwrap()).with_timeout(Duration::from_millis(200)),
    );

    let err = client.forgot_password("slow@example.com").await.unwrap_err();
    match err {
        ApiError::Unreachable(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn social_login_returns_token() {
    let client = client(&spawn_backend().await);

    let response = client.login_google("google-id-token").await.unwrap();
    assert!(!response.token.is_empty());
    assert!(response.user.is_none());

    let err = client.login_google("").await.unwrap_err();
    assert_eq!(err.status(), Some(422));
}

#[tokio::test]
async fn bearer_view_does_not_touch_shared_store() {
    let client = client(&spawn_backend().await);
    let forwarded = client.with_bearer(&sign_token(JWT_SECRET, now() + 600));

    assert!(forwarded.me().await.is_ok());
    assert!(client.token_store().load().is_none());
}
