//! UMA ticket and policy conformance tests.
//!
//! Reference: UMA 2.0 Grant for OAuth 2.0 Authorization.

use chrono::Utc;

use ids_jose::{JwsEngine, JwsPayload};
use ids_protocol::{IntrospectionRequest, TokenRequest};
use ids_uma::policy::ID_TOKEN_CLAIM_FORMAT;
use ids_uma::{
    ClaimRequirement, Policy, PolicyRule, PolicyStore, ResourceSet, ResourceSetStore, RptRequest,
    Ticket, TicketStore, UmaError,
};

use crate::harness::{TestHarness, TEST_CLIENT_ID};

async fn seed_resource(harness: &TestHarness) {
    harness
        .resource_sets
        .add(ResourceSet::new(
            "rs-records",
            "records",
            "owner-1",
            vec!["read".to_string(), "write".to_string()],
        ))
        .await
        .unwrap();
}

fn rule(scopes: &[&str], claims: Vec<ClaimRequirement>) -> PolicyRule {
    PolicyRule {
        id: "r".to_string(),
        client_ids_allowed: vec![TEST_CLIENT_ID.to_string()],
        scopes: scopes.iter().map(ToString::to_string).collect(),
        claims,
        is_resource_owner_consent_needed: false,
        script: None,
        open_id_provider: None,
    }
}

fn policy(rules: Vec<PolicyRule>) -> Policy {
    Policy {
        id: "p".to_string(),
        resource_set_ids: vec!["rs-records".to_string()],
        rules,
    }
}

fn role_claim(claim_type: &str, value: &str) -> ClaimRequirement {
    ClaimRequirement {
        claim_type: claim_type.to_string(),
        value: value.to_string(),
    }
}

/// Signs a claim token with the harness's signing key.
fn claim_token(harness: &TestHarness, claims: &[(&str, &str)]) -> String {
    let mut payload = JwsPayload::new();
    for (name, value) in claims {
        payload.insert((*name).to_string(), (*value).to_string());
    }
    let key = harness.keystore.get_by_kid("1").unwrap();
    JwsEngine::new().sign(&payload, &key.key).unwrap()
}

/// uma: ticket exchange against a satisfied policy mints an RPT that
/// introspects as active.
#[tokio::test]
async fn satisfied_policy_mints_an_introspectable_rpt() {
    let harness = TestHarness::new().await;
    seed_resource(&harness).await;
    harness
        .policies
        .add(policy(vec![rule(&["read", "write"], Vec::new())]))
        .await
        .unwrap();

    let ticket = harness
        .ticket_engine
        .create_ticket("rs-records", &["read".to_string()], TEST_CLIENT_ID)
        .await
        .unwrap();

    let response = harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: ticket.id,
                ..RptRequest::default()
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap();

    let introspected = harness
        .introspection
        .introspect(
            &IntrospectionRequest {
                token: response.rpt.clone(),
                token_type_hint: None,
                client_id: None,
                client_secret: None,
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap();
    assert!(introspected.active);
    assert_eq!(introspected.client_id.as_deref(), Some(TEST_CLIENT_ID));
}

/// uma: redeeming the same ticket twice fails `invalid_ticket`.
#[tokio::test]
async fn ticket_is_single_use() {
    let harness = TestHarness::new().await;
    seed_resource(&harness).await;
    harness
        .policies
        .add(policy(vec![rule(&["read", "write"], Vec::new())]))
        .await
        .unwrap();

    let ticket = harness
        .ticket_engine
        .create_ticket("rs-records", &["read".to_string()], TEST_CLIENT_ID)
        .await
        .unwrap();
    let request = RptRequest {
        ticket: ticket.id,
        ..RptRequest::default()
    };

    assert!(harness
        .ticket_engine
        .authorize(&request, &harness.client_instruction())
        .await
        .is_ok());
    let err = harness
        .ticket_engine
        .authorize(&request, &harness.client_instruction())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_ticket");
}

/// uma: a ticket past its TTL fails `expired_ticket`.
#[tokio::test]
async fn expired_ticket_is_refused() {
    let harness = TestHarness::new().await;
    seed_resource(&harness).await;
    harness
        .policies
        .add(policy(vec![rule(&["read", "write"], Vec::new())]))
        .await
        .unwrap();

    harness
        .tickets
        .add(Ticket {
            id: "stale-ticket".to_string(),
            resource_set_id: "rs-records".to_string(),
            scopes: vec!["read".to_string()],
            client_id: TEST_CLIENT_ID.to_string(),
            is_authorized_by_owner: false,
            created_at: Utc::now() - chrono::Duration::seconds(600),
            expires_in: 300,
        })
        .await
        .unwrap();

    let err = harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: "stale-ticket".to_string(),
                ..RptRequest::default()
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "expired_ticket");
}

/// uma: OR across rules. A policy whose second rule is satisfied
/// authorizes even though the first is not.
#[tokio::test]
async fn or_semantics_across_rules() {
    let harness = TestHarness::new().await;
    seed_resource(&harness).await;

    harness
        .policies
        .add(policy(vec![
            // Rule 1: requires scope "write" only.
            rule(&["write"], Vec::new()),
            // Rule 2: scope "read" plus role=administrator.
            rule(&["read"], vec![role_claim("role", "administrator")]),
        ]))
        .await
        .unwrap();

    let ticket = harness
        .ticket_engine
        .create_ticket("rs-records", &["read".to_string()], TEST_CLIENT_ID)
        .await
        .unwrap();

    let token = claim_token(&harness, &[("role", "administrator")]);
    let response = harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: ticket.id,
                claim_token: Some(token),
                claim_token_format: Some(ID_TOKEN_CLAIM_FORMAT.to_string()),
            },
            &harness.client_instruction(),
        )
        .await;
    assert!(response.is_ok());
}

/// uma: AND within a rule. Scope and claim must both hold; either
/// alone is denied.
#[tokio::test]
async fn and_semantics_within_a_rule() {
    let harness = TestHarness::new().await;
    seed_resource(&harness).await;
    harness
        .policies
        .add(policy(vec![rule(
            &["read"],
            vec![role_claim("role", "administrator")],
        )]))
        .await
        .unwrap();

    // Claim satisfied, scope not: the ticket asks for "write".
    let ticket = harness
        .ticket_engine
        .create_ticket("rs-records", &["write".to_string()], TEST_CLIENT_ID)
        .await
        .unwrap();
    let token = claim_token(&harness, &[("role", "administrator")]);
    let err = harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: ticket.id,
                claim_token: Some(token),
                claim_token_format: Some(ID_TOKEN_CLAIM_FORMAT.to_string()),
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "not_authorized");

    // Scope satisfied, claim not: wrong role value.
    let ticket = harness
        .ticket_engine
        .create_ticket("rs-records", &["read".to_string()], TEST_CLIENT_ID)
        .await
        .unwrap();
    let token = claim_token(&harness, &[("role", "viewer")]);
    let err = harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: ticket.id,
                claim_token: Some(token),
                claim_token_format: Some(ID_TOKEN_CLAIM_FORMAT.to_string()),
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "not_authorized");
}

/// uma: a required claim with no claim token is `need_info` with a
/// retry ticket, not a terminal denial.
#[tokio::test]
async fn need_info_flow_retries_with_more_claims() {
    let harness = TestHarness::new().await;
    seed_resource(&harness).await;
    harness
        .policies
        .add(policy(vec![rule(
            &["read"],
            vec![role_claim("role", "administrator")],
        )]))
        .await
        .unwrap();

    let ticket = harness
        .ticket_engine
        .create_ticket("rs-records", &["read".to_string()], TEST_CLIENT_ID)
        .await
        .unwrap();

    let err = harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: ticket.id,
                ..RptRequest::default()
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap_err();

    let UmaError::NeedInfo {
        ticket: retry,
        required_claims,
    } = err
    else {
        panic!("expected need_info");
    };
    assert_eq!(required_claims[0].name, "role");

    // The wire shape carries the retry ticket.
    let body = UmaError::NeedInfo {
        ticket: retry.clone(),
        required_claims,
    }
    .to_error_response();
    assert_eq!(body.error, "need_info");
    assert_eq!(body.ticket.as_deref(), Some(retry.as_str()));

    let token = claim_token(&harness, &[("role", "administrator")]);
    assert!(harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: retry,
                claim_token: Some(token),
                claim_token_format: Some(ID_TOKEN_CLAIM_FORMAT.to_string()),
            },
            &harness.client_instruction(),
        )
        .await
        .is_ok());
}

/// uma: a resource with no policy is not auto-authorized.
#[tokio::test]
async fn missing_policy_fails_closed() {
    let harness = TestHarness::new().await;
    seed_resource(&harness).await;

    let ticket = harness
        .ticket_engine
        .create_ticket("rs-records", &["read".to_string()], TEST_CLIENT_ID)
        .await
        .unwrap();

    let err = harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: ticket.id,
                ..RptRequest::default()
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "not_found");
}

/// uma: a matched policy with zero rules denies.
#[tokio::test]
async fn zero_rule_policy_denies() {
    let harness = TestHarness::new().await;
    seed_resource(&harness).await;
    harness.policies.add(policy(Vec::new())).await.unwrap();

    let ticket = harness
        .ticket_engine
        .create_ticket("rs-records", &["read".to_string()], TEST_CLIENT_ID)
        .await
        .unwrap();

    let err = harness
        .ticket_engine
        .authorize(
            &RptRequest {
                ticket: ticket.id,
                ..RptRequest::default()
            },
            &harness.client_instruction(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "not_authorized");
}

/// jwt-bearer: a replayed client assertion fails even when every other
/// claim is valid.
#[tokio::test]
async fn jwt_bearer_assertion_replay_is_rejected() {
    use ids_jose::claims::names;
    use ids_jose::{JsonWebKey, JsonWebKeySet, KeyUse, PublicJsonWebKey};
    use ids_model::{Client, GrantType, TokenEndpointAuthMethod};

    let harness = TestHarness::new().await;

    let key = JsonWebKey::generate_ec(
        "assert-key",
        KeyUse::Sig,
        ids_jose::SignatureAlgorithm::Es256,
    )
    .unwrap();
    let jwks = serde_json::to_value(JsonWebKeySet {
        keys: vec![PublicJsonWebKey::from_key(&key).unwrap()],
    })
    .unwrap();

    let mut client = Client::confidential("bearer-client", "unused");
    client.token_endpoint_auth_method = TokenEndpointAuthMethod::PrivateKeyJwt;
    client.grant_types = vec![GrantType::JwtBearer];
    client.allowed_scopes = vec!["read".to_string()];
    client.jwks = Some(jwks);
    harness.clients.insert(client);

    let assertion = JwsEngine::new()
        .sign(
            &JwsPayload::new()
                .with(names::ISS, "bearer-client")
                .with(names::SUB, "bearer-client")
                .with(names::AUD, harness.config.issuer.name.clone())
                .with(names::EXP, Utc::now().timestamp() + 300)
                .with(names::JTI, "assert-jti-1")
                .with(names::SCOPE, "read"),
            &key,
        )
        .unwrap();

    let body = format!(
        "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer\
         &client_assertion_type=urn%3Aietf%3Aparams%3Aoauth%3Aclient-assertion-type%3Ajwt-bearer\
         &client_assertion={assertion}"
    );
    let request = TokenRequest::from_form(&body).unwrap();

    let first = harness.issuer.issue(&request, None).await.unwrap();
    assert_eq!(first.scope, "read");
    assert!(first.refresh_token.is_none());

    let err = harness.issuer.issue(&request, None).await.unwrap_err();
    assert_eq!(err.error_code(), "invalid_client");
}
