//! Introspection and revocation conformance tests.
//!
//! Reference: RFC 7662, RFC 7009.

use ids_protocol::{IntrospectionRequest, RevocationRequest, TokenRequest};

use crate::harness::{basic_auth, TestHarness};

fn introspection_request(token: &str) -> IntrospectionRequest {
    IntrospectionRequest {
        token: token.to_string(),
        token_type_hint: None,
        client_id: None,
        client_secret: None,
    }
}

/// introspection: a freshly granted token is active with its claims.
#[tokio::test]
async fn granted_token_is_active() {
    let harness = TestHarness::new().await;

    let grant = harness
        .issuer
        .issue(
            &TokenRequest::from_form("grant_type=client_credentials&scope=profile").unwrap(),
            Some(&harness.basic_auth()),
        )
        .await
        .unwrap();

    let response = harness
        .introspection
        .introspect(
            &introspection_request(&grant.access_token),
            &harness.client_instruction(),
        )
        .await
        .unwrap();

    assert!(response.active);
    assert_eq!(response.scope.as_deref(), Some("profile"));
    assert_eq!(response.client_id.as_deref(), Some("WebSite"));
    assert_eq!(
        response.iss.as_deref(),
        Some(harness.config.issuer.name.as_str())
    );
}

/// introspection: unknown tokens yield `{active: false}`, not an error.
#[tokio::test]
async fn unknown_token_is_inactive() {
    let harness = TestHarness::new().await;

    let response = harness
        .introspection
        .introspect(
            &introspection_request("no-such-token"),
            &harness.client_instruction(),
        )
        .await
        .unwrap();

    assert!(!response.active);
    assert!(response.scope.is_none());
    assert!(response.client_id.is_none());
}

/// introspection: a missing token parameter is `invalid_request`.
#[tokio::test]
async fn malformed_request_is_invalid_request() {
    let err = IntrospectionRequest::from_form("token_type_hint=access_token").unwrap_err();
    assert_eq!(err.error_code(), "invalid_request");
}

/// introspection: the caller must authenticate before learning
/// anything about any token.
#[tokio::test]
async fn unauthenticated_caller_is_refused() {
    let harness = TestHarness::new().await;

    let grant = harness
        .issuer
        .issue(
            &TokenRequest::from_form("grant_type=client_credentials").unwrap(),
            Some(&harness.basic_auth()),
        )
        .await
        .unwrap();

    let header = basic_auth("WebSite", "not-the-secret");
    let instruction = ids_protocol::AuthenticationInstruction::from_parts(
        Some(&header),
        &TokenRequest::default(),
    )
    .unwrap();

    let err = harness
        .introspection
        .introspect(&introspection_request(&grant.access_token), &instruction)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_client");
}

/// revocation: a revoked token introspects inactive afterwards.
#[tokio::test]
async fn revoked_token_becomes_inactive() {
    let harness = TestHarness::new().await;

    let grant = harness
        .issuer
        .issue(
            &TokenRequest::from_form("grant_type=client_credentials").unwrap(),
            Some(&harness.basic_auth()),
        )
        .await
        .unwrap();

    harness
        .revocation
        .revoke(
            &RevocationRequest {
                token: grant.access_token.clone(),
                token_type_hint: None,
                client_id: None,
                client_secret: None,
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap();

    let response = harness
        .introspection
        .introspect(
            &introspection_request(&grant.access_token),
            &harness.client_instruction(),
        )
        .await
        .unwrap();
    assert!(!response.active);
}
