//! Token endpoint conformance tests.
//!
//! Reference: RFC 6749, RFC 7523.

use chrono::Utc;

use ids_model::AuthorizationCode;
use ids_protocol::TokenRequest;
use ids_store::{AuthorizationCodeStore, TokenStore};

use crate::harness::{basic_auth, TestHarness, TEST_PASSWORD, TEST_USERNAME};

/// token-endpoint: `client_credentials` with Basic auth returns a
/// bearer token scoped to the request.
#[tokio::test]
async fn client_credentials_end_to_end() {
    let harness = TestHarness::new().await;

    let request = TokenRequest::from_form("grant_type=client_credentials&scope=profile").unwrap();
    let response = harness
        .issuer
        .issue(&request, Some(&harness.basic_auth()))
        .await
        .unwrap();

    assert!(!response.access_token.is_empty());
    assert_eq!(response.token_type, "bearer");
    assert_eq!(response.expires_in, 3600);
    assert_eq!(response.scope, "profile");
    assert!(response.refresh_token.is_none());
    assert!(response.id_token.is_none());
}

/// token-endpoint: a scope outside the client's allowed set fails
/// `invalid_scope` with a 400 mapping.
#[tokio::test]
async fn client_credentials_scope_containment() {
    let harness = TestHarness::new().await;

    let request = TokenRequest::from_form("grant_type=client_credentials&scope=admin").unwrap();
    let err = harness
        .issuer
        .issue(&request, Some(&harness.basic_auth()))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "invalid_scope");
    assert_eq!(err.http_status(), 400);
    let body = err.to_error_response();
    assert_eq!(body.error, "invalid_scope");
    assert!(body.error_description.is_some());
}

/// token-endpoint: wrong client secret fails `invalid_client`.
#[tokio::test]
async fn invalid_client_credentials_are_rejected() {
    let harness = TestHarness::new().await;

    let request = TokenRequest::from_form("grant_type=client_credentials").unwrap();
    let err = harness
        .issuer
        .issue(&request, Some(&basic_auth("WebSite", "wrong")))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "invalid_client");
}

fn seeded_code(value: &str) -> AuthorizationCode {
    AuthorizationCode {
        code: value.to_string(),
        client_id: "WebSite".to_string(),
        redirect_uri: "https://website.example/callback".to_string(),
        scopes: vec!["openid".to_string(), "profile".to_string()],
        subject: "sub-administrator".to_string(),
        id_token_claims: None,
        user_info_claims: None,
        nonce: Some("n-0S6_WzA2Mj".to_string()),
        created_at: Utc::now(),
        expires_in: 600,
    }
}

/// token-endpoint: redeeming the same authorization code twice fails
/// `invalid_grant` on the second attempt.
#[tokio::test]
async fn authorization_code_is_single_use() {
    let harness = TestHarness::new().await;
    harness.auth_codes.add(seeded_code("code-su")).await.unwrap();

    let body = "grant_type=authorization_code&code=code-su\
                &redirect_uri=https%3A%2F%2Fwebsite.example%2Fcallback";
    let request = TokenRequest::from_form(body).unwrap();

    let first = harness
        .issuer
        .issue(&request, Some(&harness.basic_auth()))
        .await
        .unwrap();
    assert!(first.id_token.is_some());
    assert!(first.refresh_token.is_some());

    let err = harness
        .issuer
        .issue(&request, Some(&harness.basic_auth()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

/// token-endpoint: the minted ID token verifies against the public
/// JWKS and carries the subject and nonce from the code.
#[tokio::test]
async fn id_token_is_verifiable_and_faithful() {
    let harness = TestHarness::new().await;
    harness.auth_codes.add(seeded_code("code-id")).await.unwrap();

    let body = "grant_type=authorization_code&code=code-id\
                &redirect_uri=https%3A%2F%2Fwebsite.example%2Fcallback";
    let request = TokenRequest::from_form(body).unwrap();
    let response = harness
        .issuer
        .issue(&request, Some(&harness.basic_auth()))
        .await
        .unwrap();

    let id_token = response.id_token.unwrap();
    let payload = harness
        .keystore
        .parse_with_fallback(&ids_jose::JwsEngine::new(), &id_token)
        .unwrap();

    assert_eq!(payload.subject(), Some("sub-administrator"));
    assert_eq!(payload.claim_str("nonce"), Some("n-0S6_WzA2Mj"));
    assert_eq!(
        payload.issuer(),
        Some(harness.config.issuer.name.as_str())
    );
    assert!(payload.has_audience("WebSite"));
}

/// token-endpoint: an expired code is refused even on first use.
#[tokio::test]
async fn expired_authorization_code_is_refused() {
    let harness = TestHarness::new().await;
    let mut code = seeded_code("code-exp");
    code.expires_in = -1;
    harness.auth_codes.add(code).await.unwrap();

    let body = "grant_type=authorization_code&code=code-exp\
                &redirect_uri=https%3A%2F%2Fwebsite.example%2Fcallback";
    let request = TokenRequest::from_form(body).unwrap();
    let err = harness
        .issuer
        .issue(&request, Some(&harness.basic_auth()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

/// token-endpoint: password grant verifies hashed credentials and
/// issues a refresh token.
#[tokio::test]
async fn password_grant_round_trip() {
    let harness = TestHarness::new().await;

    let body = format!(
        "grant_type=password&username={TEST_USERNAME}&password={TEST_PASSWORD}&scope=openid"
    );
    let request = TokenRequest::from_form(&body).unwrap();
    let response = harness
        .issuer
        .issue(&request, Some(&harness.basic_auth()))
        .await
        .unwrap();

    assert!(response.refresh_token.is_some());
    assert!(response.id_token.is_some());

    let wrong = TokenRequest::from_form(&format!(
        "grant_type=password&username={TEST_USERNAME}&password=not-it"
    ))
    .unwrap();
    let err = harness
        .issuer
        .issue(&wrong, Some(&harness.basic_auth()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

/// token-endpoint: refreshing invalidates the superseded grant.
#[tokio::test]
async fn refresh_token_rotation() {
    let harness = TestHarness::new().await;

    let body = format!(
        "grant_type=password&username={TEST_USERNAME}&password={TEST_PASSWORD}&scope=openid"
    );
    let first = harness
        .issuer
        .issue(
            &TokenRequest::from_form(&body).unwrap(),
            Some(&harness.basic_auth()),
        )
        .await
        .unwrap();

    let refresh_body = format!(
        "grant_type=refresh_token&refresh_token={}",
        first.refresh_token.clone().unwrap()
    );
    let second = harness
        .issuer
        .issue(
            &TokenRequest::from_form(&refresh_body).unwrap(),
            Some(&harness.basic_auth()),
        )
        .await
        .unwrap();

    assert_ne!(first.access_token, second.access_token);
    assert!(harness
        .tokens
        .get_by_access_token(&first.access_token)
        .await
        .unwrap()
        .is_none());

    // The consumed refresh token is dead.
    let err = harness
        .issuer
        .issue(
            &TokenRequest::from_form(&refresh_body).unwrap(),
            Some(&harness.basic_auth()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

/// token-endpoint: unknown grant types fail `unsupported_grant_type`.
#[tokio::test]
async fn unknown_grant_type() {
    let harness = TestHarness::new().await;
    let request = TokenRequest::from_form("grant_type=urn%3Amade%3Aup").unwrap();
    let err = harness
        .issuer
        .issue(&request, Some(&harness.basic_auth()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "unsupported_grant_type");
}
